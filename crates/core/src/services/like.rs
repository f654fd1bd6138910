//! Like service with the weekly quota.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Local, TimeZone, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{entities::idea_like, repositories::{IdeaRepository, LikeRepository}};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use tracing::info;

use crate::{
    Principal,
    services::{
        gamification::{GamificationService, XpReason},
        notification::NotificationService,
    },
};

/// Likes a user may give per quota window.
pub const MAX_WEEKLY_LIKES: u64 = 3;

/// Start of the quota window containing `now`: the most recent Sunday at
/// 00:00 in `now`'s time zone, which is today when `now` is a Sunday.
#[must_use]
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let days_since_sunday = u64::from(now.weekday().num_days_from_sunday());
    let date = now
        .date_naive()
        .checked_sub_days(Days::new(days_since_sunday))
        .unwrap_or_else(|| now.date_naive());
    let midnight = date.and_time(chrono::NaiveTime::MIN);

    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Start of the current quota window in local server time.
#[must_use]
pub fn current_window_start() -> DateTime<Utc> {
    week_start(&Local::now()).with_timezone(&Utc)
}

/// Remaining likes in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub remaining_likes: u64,
    pub weekly_likes_used: u64,
    pub max_weekly_likes: u64,
}

impl LikeStatus {
    #[must_use]
    pub const fn from_used(used: u64) -> Self {
        Self {
            remaining_likes: MAX_WEEKLY_LIKES.saturating_sub(used),
            weekly_likes_used: used,
            max_weekly_likes: MAX_WEEKLY_LIKES,
        }
    }
}

/// Like service.
#[derive(Clone)]
pub struct LikeService {
    db: Arc<DatabaseConnection>,
    like_repo: LikeRepository,
    idea_repo: IdeaRepository,
    gamification_service: GamificationService,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        like_repo: LikeRepository,
        idea_repo: IdeaRepository,
        gamification_service: GamificationService,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            db,
            like_repo,
            idea_repo,
            gamification_service,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Like an idea.
    ///
    /// Checks run in order: quota, duplicate, existence, ownership. The unique
    /// index on (user, idea) is the final guard against concurrent duplicates.
    pub async fn like(&self, principal: &Principal, idea_id: &str) -> AppResult<LikeStatus> {
        let since = current_window_start();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let used = self
            .like_repo
            .count_by_user_since(&txn, &principal.user_id, since)
            .await?;
        if used >= MAX_WEEKLY_LIKES {
            return Err(AppError::BadRequest(
                "You have no likes remaining this week".to_string(),
            ));
        }

        if self
            .like_repo
            .find(&txn, &principal.user_id, idea_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already liked this idea".to_string(),
            ));
        }

        let idea = self.idea_repo.get_by_id_on(&txn, idea_id).await?;

        if idea.author_id == principal.user_id {
            return Err(AppError::BadRequest(
                "You cannot like your own idea".to_string(),
            ));
        }

        let model = idea_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(principal.user_id.clone()),
            idea_id: Set(idea_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.like_repo.create(&txn, model).await?;

        self.gamification_service
            .award(&txn, &idea.author_id, XpReason::LikeReceived)
            .await?;
        self.notification_service
            .notify_like(&txn, &idea.author_id, principal, &idea.id, &idea.title)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %principal.user_id, idea_id = %idea_id, "Idea liked");
        Ok(LikeStatus::from_used(used + 1))
    }

    /// Remove the caller's like from an idea.
    pub async fn unlike(&self, principal: &Principal, idea_id: &str) -> AppResult<LikeStatus> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = self
            .like_repo
            .delete(&txn, &principal.user_id, idea_id)
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound("Like not found".to_string()));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.status(principal).await
    }

    /// The caller's quota usage in the current window.
    pub async fn status(&self, principal: &Principal) -> AppResult<LikeStatus> {
        let used = self
            .like_repo
            .count_by_user_since(self.db.as_ref(), &principal.user_id, current_window_start())
            .await?;

        Ok(LikeStatus::from_used(used))
    }

    /// Check if the caller liked an idea.
    pub async fn has_liked(&self, principal: &Principal, idea_id: &str) -> AppResult<bool> {
        self.like_repo.exists(&principal.user_id, idea_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Weekday};
    use ideaboard_db::{
        entities::{NotificationType, UserRole, badge, idea, user},
        repositories::{
            BadgeRepository, CommentRepository, NotificationRepository, UserRepository,
        },
        test_utils::fixtures,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn at(date: (i32, u32, u32), time: (u32, u32, u32)) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, time.2)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_week_start_midweek() {
        // 2025-03-12 is a Wednesday
        let start = week_start(&at((2025, 3, 12), (15, 45, 0)));

        assert_eq!(start, at((2025, 3, 9), (0, 0, 0)));
        assert_eq!(start.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_week_start_on_sunday_is_today() {
        let start = week_start(&at((2025, 3, 9), (23, 59, 59)));
        assert_eq!(start, at((2025, 3, 9), (0, 0, 0)));

        let start = week_start(&at((2025, 3, 9), (0, 0, 0)));
        assert_eq!(start, at((2025, 3, 9), (0, 0, 0)));
    }

    #[test]
    fn test_week_start_saturday_night() {
        let start = week_start(&at((2025, 3, 15), (23, 59, 59)));
        assert_eq!(start, at((2025, 3, 9), (0, 0, 0)));
    }

    #[test]
    fn test_week_start_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        // Sunday 01:00 at +02:00 is still Saturday in UTC
        let now = tz.with_ymd_and_hms(2025, 3, 9, 1, 0, 0).unwrap();

        let start = week_start(&now);

        assert_eq!(start, tz.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_like_status() {
        assert_eq!(LikeStatus::from_used(0).remaining_likes, 3);
        assert_eq!(LikeStatus::from_used(2).remaining_likes, 1);
        assert_eq!(LikeStatus::from_used(5).remaining_likes, 0);
        assert_eq!(LikeStatus::from_used(1).max_weekly_likes, 3);
    }

    fn count(n: i64) -> BTreeMap<String, sea_orm::Value> {
        BTreeMap::from([("num_items".to_string(), sea_orm::Value::BigInt(Some(n)))])
    }

    fn service(db: MockDatabase) -> LikeService {
        build(Arc::new(db.into_connection()))
    }

    fn build(db: Arc<DatabaseConnection>) -> LikeService {
        let notifications = NotificationService::new(db.clone(), NotificationRepository::new(db.clone()));
        let gamification = GamificationService::new(
            UserRepository::new(db.clone()),
            BadgeRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            notifications.clone(),
        );
        LikeService::new(
            db.clone(),
            LikeRepository::new(db.clone()),
            IdeaRepository::new(db),
            gamification,
            notifications,
        )
    }

    fn bob() -> Principal {
        Principal::new("u2", "bob", UserRole::Employee)
    }

    #[tokio::test]
    async fn test_like_rejected_when_quota_exhausted() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[count(3)]]),
        );

        let result = service.like(&bob(), "i1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_like_twice_conflicts() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(1)]])
                .append_query_results([[fixtures::like("l1", "u2", "i1")]]),
        );

        let result = service.like(&bob(), "i1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_like_unknown_idea() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(0)]])
                .append_query_results([Vec::<idea_like::Model>::new()])
                .append_query_results([Vec::<idea::Model>::new()]),
        );

        let result = service.like(&bob(), "missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_like_own_idea_rejected() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(0)]])
                .append_query_results([Vec::<idea_like::Model>::new()])
                .append_query_results([[fixtures::idea("i1", "u2", "Mine")]]),
        );

        let result = service.like(&bob(), "i1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_not_found() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
                sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ]),
        );

        let result = service.unlike(&bob(), "i1").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_like_spends_quota_and_rewards_author() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(0)]])
                .append_query_results([Vec::<idea_like::Model>::new()])
                .append_query_results([[fixtures::idea("i1", "u1", "Solar roof")]])
                .append_query_results([[fixtures::like("l1", "u2", "i1")]])
                // LIKES_RECEIVED_10 badge is not seeded
                .append_query_results([Vec::<badge::Model>::new()])
                .append_query_results([[user::Model {
                    xp_points: 10,
                    ..fixtures::user("u1", "alice")
                }]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "u1",
                    NotificationType::Like,
                )]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = build(db.clone());
        let status = service.like(&bob(), "i1").await.unwrap();
        drop(service);

        assert_eq!(
            status,
            LikeStatus {
                remaining_likes: 2,
                weekly_likes_used: 1,
                max_weekly_likes: 3,
            }
        );

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements: Vec<String> = log[0]
            .statements()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert!(statements.iter().any(|s| s.starts_with(r#"INSERT INTO "idea_like""#)
            && s.contains("'u2'")
            && s.contains("'i1'")));
        let xp_updates: Vec<&String> = statements
            .iter()
            .filter(|s| s.starts_with(r#"UPDATE "user""#) && s.contains("xp_points"))
            .collect();
        assert_eq!(xp_updates.len(), 1);
        assert!(xp_updates[0].contains("+ 10") && xp_updates[0].contains("'u1'"));
        assert!(statements.iter().any(|s| s.starts_with(r#"INSERT INTO "notification""#)
            && s.contains("'LIKE'")
            && s.contains("'u1'")));
        // like_count is maintained by the database trigger
        assert!(!statements.iter().any(|s| s.starts_with(r#"UPDATE "idea""#)));
    }
}
