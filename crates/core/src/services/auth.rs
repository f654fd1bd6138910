//! Authentication service: registration, login and token refresh.

use std::sync::Arc;

use chrono::Utc;
use ideaboard_common::{
    AppError, AppResult, IdGenerator, JwtManager, hash_password, verify_password,
};
use ideaboard_db::{
    entities::{AuditAction, UserRole, user},
    repositories::UserRepository,
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::{
    Principal,
    services::{
        audit::{AuditEntry, AuditService, entity_type},
        user::UserResponse,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
}

/// Login credentials.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Issued token pair with the authenticated user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
    /// Access token lifetime in milliseconds.
    pub expires_in: i64,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    jwt: JwtManager,
    audit_service: AuditService,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        jwt: JwtManager,
        audit_service: AuditService,
    ) -> Self {
        Self {
            db,
            user_repo,
            jwt,
            audit_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve a bearer access token to the caller.
    pub fn authenticate(&self, token: &str) -> AppResult<Principal> {
        let claims = self.jwt.validate_access(token)?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(Principal::new(claims.sub, claims.username, role))
    }

    fn issue(&self, user: user::Model) -> AppResult<AuthResponse> {
        let role = user.role.as_str();
        let access_token = self.jwt.issue_access(&user.id, &user.username, role)?;
        let refresh_token = self.jwt.issue_refresh(&user.id, &user.username, role)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_ttl_millis(),
            user: user.into(),
        })
    }

    /// Register a new employee account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            avatar_url: Set(None),
            role: Set(UserRole::Employee),
            is_active: Set(true),
            xp_points: Set(0),
            level: Set(1),
            last_login: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let user = self.user_repo.create(&txn, model).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Create, entity_type::USER, &user.id).by(&user.id),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        self.issue(user)
    }

    /// Log in with username and password.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        input.validate()?;

        let Some(user) = self.user_repo.find_by_username(&input.username).await? else {
            debug!(username = %input.username, "Login for unknown user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&input.password, &user.password_hash)? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.user_repo.touch_last_login(&txn, &user.id).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Login, entity_type::USER, &user.id).by(&user.id),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt.validate_refresh(refresh_token)?;

        let user = self
            .user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        self.issue(user)
    }

    /// Record a logout. Tokens are stateless and simply expire.
    pub async fn logout(&self, principal: &Principal) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Logout, entity_type::USER, &principal.user_id)
                    .by(&principal.user_id),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The caller's profile.
    pub async fn me(&self, principal: &Principal) -> AppResult<UserResponse> {
        Ok(self.user_repo.get_by_id(&principal.user_id).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_common::config::AuthConfig;
    use ideaboard_db::{repositories::AuditLogRepository, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn jwt() -> JwtManager {
        JwtManager::new(&AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7200,
        })
    }

    fn service(db: MockDatabase) -> AuthService {
        let db = Arc::new(db.into_connection());
        AuthService::new(
            db.clone(),
            UserRepository::new(db.clone()),
            jwt(),
            AuditService::new(AuditLogRepository::new(db)),
        )
    }

    fn user_with_password(password: &str, is_active: bool) -> user::Model {
        user::Model {
            password_hash: hash_password(password).unwrap(),
            is_active,
            ..fixtures::user("u1", "alice")
        }
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service
            .login(LoginInput {
                username: "ghost".to_string(),
                password: "secret".to_string(),
            })
            .await;

        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, INVALID_CREDENTIALS),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user_with_password("correct", true)]]),
        );

        let result = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_deactivated() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user_with_password("secret", false)]]),
        );

        let result = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await;

        match result {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Account is deactivated"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_issues_tokens() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user_with_password("secret", true)]])
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::Login,
                    "USER",
                    "u1",
                )]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        let response = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.expires_in, 3_600_000);
        assert_eq!(response.user.username, "alice");

        let principal = service.authenticate(&response.access_token).unwrap();
        assert_eq!(principal.user_id, "u1");
        assert_eq!(principal.role, UserRole::Employee);

        assert!(service.authenticate(&response.refresh_token).is_err());
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user("u1", "alice")]]),
        );

        let result = service
            .register(RegisterInput {
                username: "alice".to_string(),
                email: "new@example.com".to_string(),
                password: "secret1".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .register(RegisterInput {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "123".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
