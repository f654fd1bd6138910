//! Survey repository: surveys, options and votes.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder,
};

use super::map_insert_err;
use crate::entities::{Survey, SurveyOption, SurveyVote, survey, survey_option, survey_vote};

/// Repository for survey operations.
#[derive(Clone)]
pub struct SurveyRepository {
    db: Arc<DatabaseConnection>,
}

impl SurveyRepository {
    /// Create a new survey repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get survey by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<survey::Model> {
        self.get_by_id_on(self.db.as_ref(), id).await
    }

    /// Get survey by ID on the given connection.
    pub async fn get_by_id_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<survey::Model> {
        Survey::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("Survey"))
    }

    /// All surveys, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<survey::Model>> {
        Survey::find()
            .order_by(survey::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active surveys, newest first.
    pub async fn find_active(&self) -> AppResult<Vec<survey::Model>> {
        Survey::find()
            .filter(survey::Column::IsActive.eq(true))
            .order_by(survey::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active surveys.
    pub async fn count_active(&self) -> AppResult<u64> {
        Survey::find()
            .filter(survey::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a survey.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: survey::ActiveModel,
    ) -> AppResult<survey::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a survey. Options and votes cascade.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        Survey::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    // ==================== Options ====================

    /// Options of a survey in display order.
    pub async fn find_options<C: ConnectionTrait>(
        &self,
        conn: &C,
        survey_id: &str,
    ) -> AppResult<Vec<survey_option::Model>> {
        SurveyOption::find()
            .filter(survey_option::Column::SurveyId.eq(survey_id))
            .order_by(survey_option::Column::DisplayOrder, Order::Asc)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Options of several surveys in display order.
    pub async fn find_options_for(
        &self,
        survey_ids: &[String],
    ) -> AppResult<Vec<survey_option::Model>> {
        if survey_ids.is_empty() {
            return Ok(vec![]);
        }

        SurveyOption::find()
            .filter(survey_option::Column::SurveyId.is_in(survey_ids.iter().cloned()))
            .order_by(survey_option::Column::DisplayOrder, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create an option.
    pub async fn create_option<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: survey_option::ActiveModel,
    ) -> AppResult<survey_option::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Votes ====================

    /// Votes a user cast on a survey.
    pub async fn find_votes_by_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        survey_id: &str,
        user_id: &str,
    ) -> AppResult<Vec<survey_vote::Model>> {
        SurveyVote::find()
            .filter(survey_vote::Column::SurveyId.eq(survey_id))
            .filter(survey_vote::Column::UserId.eq(user_id))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Votes a user cast on any of the given surveys.
    pub async fn find_votes_by_user_for(
        &self,
        survey_ids: &[String],
        user_id: &str,
    ) -> AppResult<Vec<survey_vote::Model>> {
        if survey_ids.is_empty() {
            return Ok(vec![]);
        }

        SurveyVote::find()
            .filter(survey_vote::Column::SurveyId.is_in(survey_ids.iter().cloned()))
            .filter(survey_vote::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a vote. Vote counters are maintained by a database trigger.
    pub async fn create_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: survey_vote::ActiveModel,
    ) -> AppResult<survey_vote::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "You have already voted for this option"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_options_in_order() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    fixtures::survey_option("o1", "s1", "Yes", 0),
                    fixtures::survey_option("o2", "s1", "No", 1),
                ]])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db.clone());
        let options = repo.find_options(db.as_ref(), "s1").await.unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].option_text, "Yes");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<survey::Model>::new()])
                .into_connection(),
        );

        let repo = SurveyRepository::new(db);

        assert!(matches!(
            repo.get_by_id("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
