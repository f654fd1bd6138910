//! Idea like repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, sea_query::Expr,
};

use super::map_insert_err;
use crate::entities::{IdeaLike, idea, idea_like};

/// Number of likes an idea received within a window.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct LikedIdeaCount {
    pub idea_id: String,
    pub likes: i64,
}

/// Repository for like operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's like on an idea.
    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        idea_id: &str,
    ) -> AppResult<Option<idea_like::Model>> {
        IdeaLike::find()
            .filter(idea_like::Column::UserId.eq(user_id))
            .filter(idea_like::Column::IdeaId.eq(idea_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user liked an idea.
    pub async fn exists(&self, user_id: &str, idea_id: &str) -> AppResult<bool> {
        Ok(self.find(self.db.as_ref(), user_id, idea_id).await?.is_some())
    }

    /// Count likes a user gave at or after `since`.
    pub async fn count_by_user_since<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<u64> {
        IdeaLike::find()
            .filter(idea_like::Column::UserId.eq(user_id))
            .filter(idea_like::Column::CreatedAt.gte(since))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of ideas a user liked, most recent like first.
    pub async fn find_liked_idea_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        IdeaLike::find()
            .select_only()
            .column(idea_like::Column::IdeaId)
            .filter(idea_like::Column::UserId.eq(user_id))
            .order_by(idea_like::Column::CreatedAt, Order::Desc)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all likes.
    pub async fn count_all(&self) -> AppResult<u64> {
        IdeaLike::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes given by a user.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        IdeaLike::find()
            .filter(idea_like::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count likes received on ideas authored by a user.
    pub async fn count_received_by_author<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
    ) -> AppResult<u64> {
        IdeaLike::find()
            .join(JoinType::InnerJoin, idea_like::Relation::Idea.def())
            .filter(idea::Column::AuthorId.eq(author_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ideas with the most likes received at or after `since`.
    pub async fn top_ideas_since(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<LikedIdeaCount>> {
        IdeaLike::find()
            .select_only()
            .column(idea_like::Column::IdeaId)
            .column_as(idea_like::Column::Id.count(), "likes")
            .filter(idea_like::Column::CreatedAt.gte(since))
            .group_by(idea_like::Column::IdeaId)
            .order_by(Expr::cust("likes"), Order::Desc)
            .limit(limit)
            .into_model::<LikedIdeaCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a like.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: idea_like::ActiveModel,
    ) -> AppResult<idea_like::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "You have already liked this idea"))
    }

    /// Delete a user's like on an idea. Returns the number of rows removed.
    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        idea_id: &str,
    ) -> AppResult<u64> {
        let result = IdeaLike::delete_many()
            .filter(idea_like::Column::UserId.eq(user_id))
            .filter(idea_like::Column::IdeaId.eq(idea_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_exists() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::like("l1", "u1", "i1")]])
                .append_query_results([Vec::<idea_like::Model>::new()])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);

        assert!(repo.exists("u1", "i1").await.unwrap());
        assert!(!repo.exists("u2", "i1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = LikeRepository::new(db.clone());
        let removed = repo.delete(db.as_ref(), "u1", "i1").await.unwrap();

        assert_eq!(removed, 0);
    }
}
