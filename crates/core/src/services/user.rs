//! User service.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult};
use ideaboard_db::{
    entities::{AuditAction, UserRole, user},
    repositories::UserRepository,
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    Principal,
    services::audit::{AuditEntry, AuditService, entity_type},
};

/// Public view of a user, embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub level: i32,
}

impl From<&user::Model> for UserSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            avatar_url: u.avatar_url.clone(),
            role: u.role,
            level: u.level,
        }
    }
}

/// Load summaries for the given user IDs, keyed by ID.
pub(crate) async fn load_summaries(
    user_repo: &UserRepository,
    ids: impl IntoIterator<Item = String>,
) -> AppResult<HashMap<String, UserSummary>> {
    let mut ids: Vec<String> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let users = user_repo.find_by_ids(&ids).await?;
    Ok(users
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect())
}

/// Full user profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub xp_points: i32,
    pub level: i32,
    pub last_login: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            avatar_url: u.avatar_url,
            role: u.role,
            is_active: u.is_active,
            xp_points: u.xp_points,
            level: u.level,
            last_login: u.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Input for updating the caller's own profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    audit_service: AuditService,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        audit_service: AuditService,
    ) -> Self {
        Self {
            db,
            user_repo,
            audit_service,
        }
    }

    /// The caller's profile.
    pub async fn me(&self, principal: &Principal) -> AppResult<UserResponse> {
        Ok(self.user_repo.get_by_id(&principal.user_id).await?.into())
    }

    /// Update the caller's name and email.
    pub async fn update_me(
        &self,
        principal: &Principal,
        input: UpdateProfileInput,
    ) -> AppResult<UserResponse> {
        input.validate()?;

        let user = self.user_repo.get_by_id(&principal.user_id).await?;

        if let Some(email) = input.email.as_deref()
            && email != user.email
            && self.user_repo.find_by_email(email).await?.is_some()
        {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let mut active: user::ActiveModel = user.into();
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        active.updated_at = Set(Utc::now().into());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let updated = self.user_repo.update(&txn, active).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Update, entity_type::USER, &updated.id)
                    .by(&principal.user_id),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated.into())
    }

    /// Every user, admin only.
    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<UserResponse>> {
        principal.require_admin()?;

        let users = self.user_repo.find_all().await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    /// A user by ID, admin only.
    pub async fn get(&self, principal: &Principal, id: &str) -> AppResult<UserResponse> {
        principal.require_admin()?;

        Ok(self.user_repo.get_by_id(id).await?.into())
    }

    /// Change a user's role, admin only.
    pub async fn update_role(
        &self,
        principal: &Principal,
        id: &str,
        role: UserRole,
    ) -> AppResult<UserResponse> {
        principal.require_admin()?;

        let user = self.user_repo.get_by_id(id).await?;
        let old_role = user.role;

        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Utc::now().into());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let updated = self.user_repo.update(&txn, active).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Update, entity_type::USER, id)
                    .by(&principal.user_id)
                    .old(json!({ "role": old_role }))
                    .new_value(json!({ "role": role })),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %id, role = %role, changed_by = %principal.user_id, "User role changed");
        Ok(updated.into())
    }

    /// Activate or deactivate a user, admin only.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: &str,
        is_active: bool,
    ) -> AppResult<UserResponse> {
        principal.require_admin()?;

        if !is_active && id == principal.user_id {
            return Err(AppError::BadRequest(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(id).await?;
        let was_active = user.is_active;

        let mut active: user::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now().into());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let updated = self.user_repo.update(&txn, active).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Update, entity_type::USER, id)
                    .by(&principal.user_id)
                    .old(json!({ "isActive": was_active }))
                    .new_value(json!({ "isActive": is_active })),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %id, is_active = is_active, "User status changed");
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{repositories::AuditLogRepository, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: MockDatabase) -> UserService {
        let db = Arc::new(db.into_connection());
        UserService::new(
            db.clone(),
            UserRepository::new(db.clone()),
            AuditService::new(AuditLogRepository::new(db)),
        )
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_self() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let admin = Principal::new("a1", "root", UserRole::Admin);

        let result = service.update_status(&admin, "a1", false).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_role_requires_admin() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let pm = Principal::new("p1", "pm", UserRole::ProjectManager);

        let result = service.update_role(&pm, "u1", UserRole::Admin).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_role() {
        let before = fixtures::user("u1", "alice");
        let after = fixtures::user_with_role("u1", "alice", UserRole::ProjectManager);

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[before]])
                .append_query_results([[after]])
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::Update,
                    "USER",
                    "u1",
                )]]),
        );
        let admin = Principal::new("a1", "root", UserRole::Admin);

        let updated = service
            .update_role(&admin, "u1", UserRole::ProjectManager)
            .await
            .unwrap();

        assert_eq!(updated.role, UserRole::ProjectManager);
    }

    #[test]
    fn test_summary_hides_email() {
        let summary = UserSummary::from(&fixtures::user("u1", "alice"));
        let json = serde_json::to_value(&summary).unwrap();

        assert!(json.get("email").is_none());
        assert_eq!(json["firstName"], "Test");
    }
}
