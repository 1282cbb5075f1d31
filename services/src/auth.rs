use crate::service::{ServiceError, ServiceResult};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

/// The authenticated actor performing an operation. Resolved by the
/// session layer upstream; write paths stamp actor ids onto rows.
/// Role-specific permission checks live with the policy collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

pub fn require_auth(user: Option<AuthUser>) -> ServiceResult<AuthUser> {
    user.ok_or(ServiceError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_session_is_rejected() {
        let err = require_auth(None).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));
    }

    #[test]
    fn present_session_passes_through() {
        let user = AuthUser {
            id: 3,
            role: Role::Teacher,
        };
        assert_eq!(require_auth(Some(user)).unwrap(), user);
    }

    #[test]
    fn roles_render_snake_case() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
    }
}
