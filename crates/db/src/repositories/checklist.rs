//! Checklist item repository.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{ChecklistItem, checklist_item};

/// Repository for checklist item operations.
#[derive(Clone)]
pub struct ChecklistRepository {
    db: Arc<DatabaseConnection>,
}

impl ChecklistRepository {
    /// Create a new checklist repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Items of an idea in ordinal order.
    pub async fn find_by_idea(&self, idea_id: &str) -> AppResult<Vec<checklist_item::Model>> {
        ChecklistItem::find()
            .filter(checklist_item::Column::IdeaId.eq(idea_id))
            .order_by(checklist_item::Column::OrdinalPosition, Order::Asc)
            .order_by(checklist_item::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get item by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<checklist_item::Model> {
        ChecklistItem::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("Checklist item"))
    }

    /// Highest ordinal position used by an idea's items.
    pub async fn max_ordinal<C: ConnectionTrait>(
        &self,
        conn: &C,
        idea_id: &str,
    ) -> AppResult<Option<i32>> {
        ChecklistItem::find()
            .select_only()
            .column_as(checklist_item::Column::OrdinalPosition.max(), "max_ordinal")
            .filter(checklist_item::Column::IdeaId.eq(idea_id))
            .into_tuple::<Option<i32>>()
            .one(conn)
            .await
            .map(Option::flatten)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Completed and total item counts of an idea.
    pub async fn completion_counts<C: ConnectionTrait>(
        &self,
        conn: &C,
        idea_id: &str,
    ) -> AppResult<(u64, u64)> {
        let total = ChecklistItem::find()
            .filter(checklist_item::Column::IdeaId.eq(idea_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let completed = ChecklistItem::find()
            .filter(checklist_item::Column::IdeaId.eq(idea_id))
            .filter(checklist_item::Column::IsCompleted.eq(true))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((completed, total))
    }

    /// Create a new item.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: checklist_item::ActiveModel,
    ) -> AppResult<checklist_item::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an item.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: checklist_item::ActiveModel,
    ) -> AppResult<checklist_item::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an item.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        ChecklistItem::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_find_by_idea() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    fixtures::checklist_item("c1", "i1", 0, true),
                    fixtures::checklist_item("c2", "i1", 1, false),
                ]])
                .into_connection(),
        );

        let repo = ChecklistRepository::new(db);
        let items = repo.find_by_idea("i1").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "c1");
    }

    #[tokio::test]
    async fn test_completion_counts() {
        let count = |n: i64| {
            BTreeMap::from([("num_items".to_string(), sea_orm::Value::BigInt(Some(n)))])
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(4)], [count(1)]])
                .into_connection(),
        );

        let repo = ChecklistRepository::new(db.clone());
        let (completed, total) = repo.completion_counts(db.as_ref(), "i1").await.unwrap();

        assert_eq!((completed, total), (1, 4));
    }
}
