// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Number of times a statistics transaction is retried on a
/// serialization failure before surfacing a Conflict to the client.
pub const STATS_RETRY_LIMIT: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Minimum score (percentage) for an attempt to count as passed.
    /// The same threshold drives the pass flag and the streak rule.
    pub passing_score: f64,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let passing_score = env::var("PASSING_SCORE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60.0);

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            passing_score,
            admin_email,
            admin_password,
        }
    }
}
