//! Signed access and refresh tokens.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, config::AuthConfig};

/// Token kind, carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token accepted on every authenticated request.
    Access,
    /// Long-lived token accepted only by the refresh endpoint.
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Role name, e.g. `PROJECT_MANAGER`.
    pub role: String,
    /// Token kind.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

/// Issues and validates HS256 tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    /// Create a manager from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    /// Access token lifetime in milliseconds.
    #[must_use]
    pub const fn access_ttl_millis(&self) -> i64 {
        self.access_ttl_secs * 1000
    }

    /// Issue an access token.
    pub fn issue_access(&self, user_id: &str, username: &str, role: &str) -> AppResult<String> {
        self.issue(user_id, username, role, TokenType::Access, self.access_ttl_secs)
    }

    /// Issue a refresh token.
    pub fn issue_refresh(&self, user_id: &str, username: &str, role: &str) -> AppResult<String> {
        self.issue(user_id, username, role, TokenType::Refresh, self.refresh_ttl_secs)
    }

    fn issue(
        &self,
        user_id: &str,
        username: &str,
        role: &str,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            token_type,
            iat: now,
            exp: now + ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate an access token. Refresh tokens are rejected.
    pub fn validate_access(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized(
                "Refresh token cannot be used for authentication".to_string(),
            ));
        }
        Ok(claims)
    }

    /// Validate a refresh token. Access tokens are rejected.
    pub fn validate_refresh(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
        }
        Ok(claims)
    }

    fn decode(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(access_ttl_secs: i64) -> JwtManager {
        JwtManager::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: access_ttl_secs,
            refresh_token_ttl_secs: 3600,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = manager(60);
        let token = jwt.issue_access("u1", "alice", "EMPLOYEE").unwrap();

        let claims = jwt.validate_access(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "EMPLOYEE");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let jwt = manager(60);
        let token = jwt.issue_refresh("u1", "alice", "EMPLOYEE").unwrap();

        assert!(matches!(
            jwt.validate_access(&token),
            Err(AppError::Unauthorized(_))
        ));
        assert!(jwt.validate_refresh(&token).is_ok());
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let jwt = manager(60);
        let token = jwt.issue_access("u1", "alice", "EMPLOYEE").unwrap();
        assert!(jwt.validate_refresh(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = manager(-120);
        let token = jwt.issue_access("u1", "alice", "EMPLOYEE").unwrap();
        assert!(jwt.validate_access(&token).is_err());
    }

    #[test]
    fn test_malformed_and_foreign_tokens_rejected() {
        let jwt = manager(60);
        assert!(jwt.validate_access("not.a.jwt").is_err());

        let other = JwtManager::new(&AuthConfig {
            jwt_secret: "other-secret".to_string(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 60,
        });
        let token = other.issue_access("u1", "alice", "ADMIN").unwrap();
        assert!(jwt.validate_access(&token).is_err());
    }
}
