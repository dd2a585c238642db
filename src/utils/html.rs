use ammonia;

/// Clean user-submitted rich text using the ammonia library.
///
/// Quiz descriptions, question text and explanations come straight from
/// teacher input and end up rendered in a browser. Whitelist-based
/// sanitization keeps safe tags (like <b>, <p>) while stripping dangerous
/// ones (like <script>) and malicious attributes (like onclick).
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
