//! Comment and comment reaction repository.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

use super::map_insert_err;
use crate::entities::{Comment, CommentReaction, comment, comment_reaction};

/// Repository for comments and their emoji reactions.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Comments of an idea, oldest first.
    pub async fn find_by_idea(&self, idea_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::IdeaId.eq(idea_id))
            .order_by(comment::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get comment by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("Comment"))
    }

    /// Count all comments.
    pub async fn count_all(&self) -> AppResult<u64> {
        Comment::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments written by a user.
    pub async fn count_by_author<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
    ) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::AuthorId.eq(author_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a comment.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: comment::ActiveModel,
    ) -> AppResult<comment::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment. Reactions cascade.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Reactions ====================

    /// Reactions on the given comments.
    pub async fn find_reactions(
        &self,
        comment_ids: &[String],
    ) -> AppResult<Vec<comment_reaction::Model>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.is_in(comment_ids.iter().cloned()))
            .order_by(comment_reaction::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user's reaction with a specific emoji.
    pub async fn find_reaction<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> AppResult<Option<comment_reaction::Model>> {
        CommentReaction::find()
            .filter(comment_reaction::Column::CommentId.eq(comment_id))
            .filter(comment_reaction::Column::UserId.eq(user_id))
            .filter(comment_reaction::Column::Emoji.eq(emoji))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a reaction.
    pub async fn create_reaction<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: comment_reaction::ActiveModel,
    ) -> AppResult<comment_reaction::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "You have already reacted with this emoji"))
    }

    /// Delete a reaction.
    pub async fn delete_reaction<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        CommentReaction::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Increment reaction count atomically.
    pub async fn increment_reaction_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
    ) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReactionCount,
                Expr::col(comment::Column::ReactionCount).add(1),
            )
            .filter(comment::Column::Id.eq(comment_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Decrement reaction count atomically.
    pub async fn decrement_reaction_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
    ) -> AppResult<()> {
        Comment::update_many()
            .col_expr(
                comment::Column::ReactionCount,
                Expr::cust("GREATEST(reaction_count - 1, 0)"),
            )
            .filter(comment::Column::Id.eq(comment_id))
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

    #[tokio::test]
    async fn test_find_by_idea() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    fixtures::comment("c1", "i1", "u1", "First"),
                    fixtures::comment("c2", "i1", "u2", "Second"),
                ]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let comments = repo.find_by_idea("i1").await.unwrap();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].content, "Second");
    }

    #[tokio::test]
    async fn test_find_reactions_empty_input_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = CommentRepository::new(db);
        let reactions = repo.find_reactions(&[]).await.unwrap();

        assert!(reactions.is_empty());
    }
}
