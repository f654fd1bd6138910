//! Authenticated caller identity.

use ideaboard_common::{AppError, AppResult};
use ideaboard_db::entities::UserRole;

/// The authenticated user a service call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Project managers and admins.
    #[must_use]
    pub const fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    /// Fail with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Fail with `Forbidden` unless the caller is a project manager or admin.
    pub fn require_manager(&self) -> AppResult<()> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Project manager or admin access required".to_string(),
            ))
        }
    }

    /// True if the caller is `user_id` or an admin.
    #[must_use]
    pub fn is_self_or_admin(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_gates() {
        let admin = Principal::new("a", "admin", UserRole::Admin);
        let pm = Principal::new("p", "pm", UserRole::ProjectManager);
        let emp = Principal::new("e", "emp", UserRole::Employee);

        assert!(admin.require_admin().is_ok());
        assert!(admin.require_manager().is_ok());
        assert!(pm.require_manager().is_ok());
        assert!(matches!(pm.require_admin(), Err(AppError::Forbidden(_))));
        assert!(matches!(emp.require_manager(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_is_self_or_admin() {
        let emp = Principal::new("e", "emp", UserRole::Employee);
        assert!(emp.is_self_or_admin("e"));
        assert!(!emp.is_self_or_admin("other"));
        assert!(Principal::new("a", "admin", UserRole::Admin).is_self_or_admin("other"));
    }
}
