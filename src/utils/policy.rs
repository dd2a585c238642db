// src/utils/policy.rs

use crate::{error::AppError, utils::jwt::Claims};

/// What the actor wants to do with a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// The resource an action targets. Ownership is carried as the owning
/// user id where it matters for the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A user profile (update/delete own account, admin may touch any).
    Profile { owner_id: i64 },
    /// A teacher-authored quiz.
    Quiz { owner_id: i64 },
    /// Curriculum content: phases, themes, theme questions, answer options.
    Content,
    /// A user's statistics record (phase progress writes target own record).
    Statistics { owner_id: i64 },
}

fn is_admin(actor: &Claims) -> bool {
    actor.role == "admin"
}

fn is_teacher(actor: &Claims) -> bool {
    actor.role == "teacher"
}

/// Single policy evaluation point for every mutating endpoint.
///
/// Handlers call this instead of repeating inline role checks; the rules:
/// - admins may do anything,
/// - profiles and statistics belong to their owner,
/// - quizzes may be mutated by their owning teacher,
/// - curriculum content is writable by teachers and admins, readable by all.
pub fn authorize(actor: &Claims, action: Action, resource: Resource) -> Result<(), AppError> {
    if is_admin(actor) {
        return Ok(());
    }

    let allowed = match resource {
        Resource::Profile { owner_id } => actor.user_id() == owner_id,
        Resource::Quiz { owner_id } => is_teacher(actor) && actor.user_id() == owner_id,
        Resource::Content => match action {
            Action::Read => true,
            _ => is_teacher(actor),
        },
        Resource::Statistics { owner_id } => match action {
            Action::Read => true,
            _ => actor.user_id() == owner_id,
        },
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not allowed to perform this action".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: i64, role: &str) -> Claims {
        Claims {
            sub: id.to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn admin_can_do_anything() {
        let admin = actor(1, "admin");
        assert!(authorize(&admin, Action::Delete, Resource::Profile { owner_id: 42 }).is_ok());
        assert!(authorize(&admin, Action::Update, Resource::Quiz { owner_id: 42 }).is_ok());
        assert!(authorize(&admin, Action::Create, Resource::Content).is_ok());
    }

    #[test]
    fn user_owns_only_their_profile() {
        let user = actor(7, "user");
        assert!(authorize(&user, Action::Update, Resource::Profile { owner_id: 7 }).is_ok());
        assert!(authorize(&user, Action::Update, Resource::Profile { owner_id: 8 }).is_err());
    }

    #[test]
    fn teacher_mutates_only_their_own_quizzes() {
        let teacher = actor(3, "teacher");
        assert!(authorize(&teacher, Action::Update, Resource::Quiz { owner_id: 3 }).is_ok());
        assert!(authorize(&teacher, Action::Delete, Resource::Quiz { owner_id: 4 }).is_err());
    }

    #[test]
    fn students_read_but_do_not_write_content() {
        let student = actor(5, "student");
        assert!(authorize(&student, Action::Read, Resource::Content).is_ok());
        assert!(authorize(&student, Action::Create, Resource::Content).is_err());

        let teacher = actor(6, "teacher");
        assert!(authorize(&teacher, Action::Create, Resource::Content).is_ok());
    }

    #[test]
    fn statistics_writes_target_own_record() {
        let student = actor(9, "student");
        assert!(authorize(&student, Action::Update, Resource::Statistics { owner_id: 9 }).is_ok());
        assert!(authorize(&student, Action::Update, Resource::Statistics { owner_id: 1 }).is_err());
        assert!(authorize(&student, Action::Read, Resource::Statistics { owner_id: 1 }).is_ok());
    }
}
