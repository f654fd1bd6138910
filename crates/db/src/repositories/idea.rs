//! Idea repository.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, FromQueryResult, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Statement,
    sea_query::{Expr, Func},
};
use serde::Serialize;

use crate::entities::{Idea, IdeaStatus, idea};

/// Filters for idea listings. All fields are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct IdeaFilter {
    pub category: Option<String>,
    pub status: Option<IdeaStatus>,
    pub author_id: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

/// Number of ideas per category.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Number of ideas created on one day.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Usage count of a tag across all ideas.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Repository for idea operations.
#[derive(Clone)]
pub struct IdeaRepository {
    db: Arc<DatabaseConnection>,
}

impl IdeaRepository {
    /// Create a new idea repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Find idea by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<idea::Model>> {
        Idea::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get idea by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<idea::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Idea"))
    }

    /// Get idea by ID on the given connection.
    pub async fn get_by_id_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<idea::Model> {
        Idea::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("Idea"))
    }

    /// Find ideas by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<idea::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Idea::find()
            .filter(idea::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn filter_condition(filter: &IdeaFilter) -> Condition {
        let mut condition = Condition::all();

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            condition = condition.add(idea::Column::Category.eq(category));
        }
        if let Some(status) = filter.status {
            condition = condition.add(idea::Column::Status.eq(status));
        }
        if let Some(author_id) = filter.author_id.as_deref() {
            condition = condition.add(idea::Column::AuthorId.eq(author_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(idea::Column::Title))).like(&pattern))
                    .add(
                        Expr::expr(Func::lower(Expr::col(idea::Column::Description)))
                            .like(&pattern),
                    ),
            );
        }

        condition
    }

    /// Search ideas newest first. Returns one page and the total match count.
    pub async fn search(
        &self,
        filter: &IdeaFilter,
        page: u64,
        size: u64,
    ) -> AppResult<(Vec<idea::Model>, u64)> {
        let condition = Self::filter_condition(filter);

        let total = Idea::find()
            .filter(condition.clone())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let items = Idea::find()
            .filter(condition)
            .order_by(idea::Column::CreatedAt, Order::Desc)
            .offset(page.saturating_mul(size))
            .limit(size)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((items, total))
    }

    /// All ideas, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<idea::Model>> {
        Idea::find()
            .order_by(idea::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest ideas.
    pub async fn find_newest(&self, limit: u64) -> AppResult<Vec<idea::Model>> {
        Idea::find()
            .order_by(idea::Column::CreatedAt, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ideas with the most likes of all time.
    pub async fn find_top_by_likes(&self, limit: u64) -> AppResult<Vec<idea::Model>> {
        Idea::find()
            .order_by(idea::Column::LikeCount, Order::Desc)
            .order_by(idea::Column::CreatedAt, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Distinct categories in alphabetical order.
    pub async fn find_categories(&self) -> AppResult<Vec<String>> {
        Idea::find()
            .select_only()
            .column(idea::Column::Category)
            .distinct()
            .order_by(idea::Column::Category, Order::Asc)
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most used tags.
    pub async fn find_popular_tags(&self, limit: u64) -> AppResult<Vec<TagCount>> {
        TagCount::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"SELECT tag, COUNT(*) AS count
              FROM idea, jsonb_array_elements_text(idea.tags) AS tag
              GROUP BY tag
              ORDER BY count DESC, tag ASC
              LIMIT $1",
            [i64::try_from(limit).unwrap_or(i64::MAX).into()],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all ideas.
    pub async fn count_all(&self) -> AppResult<u64> {
        Idea::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count ideas created at or after `since`.
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        Idea::find()
            .filter(idea::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count ideas by author on the given connection.
    pub async fn count_by_author<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
    ) -> AppResult<u64> {
        Idea::find()
            .filter(idea::Column::AuthorId.eq(author_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Idea counts grouped by status.
    pub async fn count_by_status(&self) -> AppResult<Vec<(IdeaStatus, i64)>> {
        Idea::find()
            .select_only()
            .column(idea::Column::Status)
            .column_as(idea::Column::Id.count(), "count")
            .group_by(idea::Column::Status)
            .into_tuple::<(IdeaStatus, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Idea counts grouped by category, most popular first.
    pub async fn count_by_category(&self) -> AppResult<Vec<CategoryCount>> {
        Idea::find()
            .select_only()
            .column(idea::Column::Category)
            .column_as(idea::Column::Id.count(), "count")
            .group_by(idea::Column::Category)
            .order_by(Expr::cust("count"), Order::Desc)
            .order_by(idea::Column::Category, Order::Asc)
            .into_model::<CategoryCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ideas created per day since `since`, oldest day first.
    pub async fn count_daily_since(&self, since: DateTime<Utc>) -> AppResult<Vec<DailyCount>> {
        Idea::find()
            .select_only()
            .column_as(Expr::cust("DATE(created_at)"), "day")
            .column_as(idea::Column::Id.count(), "count")
            .filter(idea::Column::CreatedAt.gte(since))
            .group_by(Expr::cust("DATE(created_at)"))
            .order_by(Expr::cust("DATE(created_at)"), Order::Asc)
            .into_model::<DailyCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new idea.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: idea::ActiveModel,
    ) -> AppResult<idea::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an idea.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: idea::ActiveModel,
    ) -> AppResult<idea::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an idea. Children are removed by foreign-key cascade.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Idea::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Set progress percentage.
    pub async fn set_progress<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
        progress: i32,
    ) -> AppResult<()> {
        Idea::update_many()
            .col_expr(idea::Column::ProgressPercentage, Expr::value(progress))
            .col_expr(idea::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(idea::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Increment view count atomically.
    pub async fn increment_view_count(&self, id: &str) -> AppResult<()> {
        Idea::update_many()
            .col_expr(
                idea::Column::ViewCount,
                Expr::col(idea::Column::ViewCount).add(1),
            )
            .filter(idea::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Increment comment count atomically.
    pub async fn increment_comment_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<()> {
        Idea::update_many()
            .col_expr(
                idea::Column::CommentCount,
                Expr::col(idea::Column::CommentCount).add(1),
            )
            .filter(idea::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Decrement comment count atomically.
    pub async fn decrement_comment_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<()> {
        Idea::update_many()
            .col_expr(
                idea::Column::CommentCount,
                Expr::cust("GREATEST(comment_count - 1, 0)"),
            )
            .filter(idea::Column::Id.eq(id))
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
    async fn test_find_by_id() {
        let idea = fixtures::idea("i1", "u1", "Solar roof");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[idea.clone()]])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let result = repo.get_by_id("i1").await.unwrap();

        assert_eq!(result.title, "Solar roof");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<idea::Model>::new()])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        assert!(matches!(
            repo.get_by_id("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let condition = IdeaRepository::filter_condition(&IdeaFilter::default());
        assert!(condition.is_empty());

        let condition = IdeaRepository::filter_condition(&IdeaFilter {
            search: Some("   ".to_string()),
            category: Some(String::new()),
            ..Default::default()
        });
        assert!(condition.is_empty());
    }

    #[test]
    fn test_filter_combines_criteria() {
        let condition = IdeaRepository::filter_condition(&IdeaFilter {
            category: Some("Process".to_string()),
            status: Some(IdeaStatus::InProgress),
            author_id: Some("u1".to_string()),
            search: Some("Solar".to_string()),
        });
        assert_eq!(condition.len(), 4);
    }
}
