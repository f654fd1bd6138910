//! Audit log repository.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{AuditLog, audit_log};

/// Repository for audit log entries. Entries are append-only.
#[derive(Clone)]
pub struct AuditLogRepository {
    db: Arc<DatabaseConnection>,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: audit_log::ActiveModel,
    ) -> AppResult<audit_log::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Recent entries, newest first, optionally restricted to one entity type.
    pub async fn find_recent(
        &self,
        entity_type: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<audit_log::Model>> {
        let mut query = AuditLog::find();

        if let Some(entity_type) = entity_type {
            query = query.filter(audit_log::Column::EntityType.eq(entity_type));
        }

        query
            .order_by(audit_log::Column::CreatedAt, Order::Desc)
            .order_by(audit_log::Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::AuditAction;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_recent_filtered() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::Create,
                    "IDEA",
                    "i1",
                )]])
                .into_connection(),
        );

        let repo = AuditLogRepository::new(db);
        let entries = repo.find_recent(Some("IDEA"), 100).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Create);
    }
}
