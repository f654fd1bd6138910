//! Badge repository.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder,
};

use super::map_insert_err;
use crate::entities::{Badge, UserBadge, badge, user_badge};

/// Repository for badges and the badges users have earned.
#[derive(Clone)]
pub struct BadgeRepository {
    db: Arc<DatabaseConnection>,
}

impl BadgeRepository {
    /// Create a new badge repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Every badge definition.
    pub async fn find_all(&self) -> AppResult<Vec<badge::Model>> {
        Badge::find()
            .order_by(badge::Column::XpReward, Order::Asc)
            .order_by(badge::Column::Name, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the badge with the given criteria key.
    pub async fn find_by_criteria<C: ConnectionTrait>(
        &self,
        conn: &C,
        criteria: &str,
    ) -> AppResult<Option<badge::Model>> {
        Badge::find()
            .filter(badge::Column::Criteria.eq(criteria))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Badges earned by a user.
    pub async fn find_earned(&self, user_id: &str) -> AppResult<Vec<user_badge::Model>> {
        UserBadge::find()
            .filter(user_badge::Column::UserId.eq(user_id))
            .order_by(user_badge::Column::EarnedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user holds a badge.
    pub async fn has_badge<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        badge_id: &str,
    ) -> AppResult<bool> {
        let found = UserBadge::find()
            .filter(user_badge::Column::UserId.eq(user_id))
            .filter(user_badge::Column::BadgeId.eq(badge_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(found.is_some())
    }

    /// Award a badge.
    pub async fn award<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: user_badge::ActiveModel,
    ) -> AppResult<user_badge::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| map_insert_err(e, "Badge already earned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_has_badge() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::user_badge("ub1", "u1", "badge_first_idea")]])
                .append_query_results([Vec::<user_badge::Model>::new()])
                .into_connection(),
        );

        let repo = BadgeRepository::new(db.clone());

        assert!(repo.has_badge(db.as_ref(), "u1", "badge_first_idea").await.unwrap());
        assert!(!repo.has_badge(db.as_ref(), "u1", "badge_ideas_5").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_criteria() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::badge("badge_first_idea", "FIRST_IDEA", 25)]])
                .into_connection(),
        );

        let repo = BadgeRepository::new(db.clone());
        let badge = repo
            .find_by_criteria(db.as_ref(), "FIRST_IDEA")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(badge.xp_reward, 25);
    }
}
