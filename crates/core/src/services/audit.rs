//! Audit trail service.

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppResult, IdGenerator};
use ideaboard_db::{
    entities::{AuditAction, audit_log},
    repositories::AuditLogRepository,
};
use sea_orm::{ConnectionTrait, Set};
use serde::Serialize;
use serde_json::Value;

use crate::Principal;

/// Entity type names recorded in the audit log.
pub mod entity_type {
    pub const IDEA: &str = "IDEA";
    pub const USER: &str = "USER";
    pub const SURVEY: &str = "SURVEY";
    pub const FILE: &str = "FILE";
}

/// Default number of entries returned by a listing.
pub const DEFAULT_AUDIT_LIMIT: u64 = 100;

/// A change to be appended to the audit log.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl AuditEntry {
    #[must_use]
    pub fn new(action: AuditAction, entity_type: &'static str, entity_id: &str) -> Self {
        Self {
            user_id: None,
            action,
            entity_type,
            entity_id: Some(entity_id.to_string()),
            old_value: None,
            new_value: None,
        }
    }

    /// Set the acting user.
    #[must_use]
    pub fn by(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    #[must_use]
    pub fn old(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }

    #[must_use]
    pub fn new_value(mut self, value: Value) -> Self {
        self.new_value = Some(value);
        self
    }
}

/// Audit log entry as returned to admins.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<audit_log::Model> for AuditLogResponse {
    fn from(m: audit_log::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            action: m.action,
            entity_type: m.entity_type,
            entity_id: m.entity_id,
            old_value: m.old_value,
            new_value: m.new_value,
            created_at: m.created_at,
        }
    }
}

/// Audit service.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditLogRepository,
    id_gen: IdGenerator,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(audit_repo: AuditLogRepository) -> Self {
        Self {
            audit_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Append an entry within the caller's unit of work.
    pub async fn record<C: ConnectionTrait>(&self, conn: &C, entry: AuditEntry) -> AppResult<()> {
        let model = audit_log::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            entity_type: Set(entry.entity_type.to_string()),
            entity_id: Set(entry.entity_id),
            old_value: Set(entry.old_value),
            new_value: Set(entry.new_value),
            created_at: Set(Utc::now().into()),
        };

        self.audit_repo.create(conn, model).await?;
        Ok(())
    }

    /// Recent entries, admin only.
    pub async fn list(
        &self,
        principal: &Principal,
        entity_type: Option<&str>,
        limit: Option<u64>,
    ) -> AppResult<Vec<AuditLogResponse>> {
        principal.require_admin()?;

        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, 1000);
        let entries = self.audit_repo.find_recent(entity_type, limit).await?;

        Ok(entries.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_common::AppError;
    use ideaboard_db::entities::UserRole;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_entry_builder() {
        let entry = AuditEntry::new(AuditAction::StatusChange, entity_type::IDEA, "i1")
            .by("u1")
            .old(json!({"status": "CONCEPT"}))
            .new_value(json!({"status": "COMPLETED"}));

        assert_eq!(entry.user_id.as_deref(), Some("u1"));
        assert_eq!(entry.old_value, Some(json!({"status": "CONCEPT"})));
        assert_eq!(entry.new_value, Some(json!({"status": "COMPLETED"})));
    }

    #[tokio::test]
    async fn test_list_requires_admin() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = AuditService::new(AuditLogRepository::new(db));

        let pm = Principal::new("p", "pm", UserRole::ProjectManager);
        let result = service.list(&pm, None, None).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
