//! XP, levels and badges.

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppResult, IdGenerator};
use ideaboard_db::{
    entities::{badge, user_badge},
    repositories::{
        BadgeRepository, CommentRepository, IdeaRepository, LikeRepository, UserRepository,
    },
};
use sea_orm::{ConnectionTrait, Set};
use serde::Serialize;
use tracing::info;

use crate::services::notification::NotificationService;

/// XP required per level.
pub const XP_PER_LEVEL: i32 = 100;

/// Badge criteria keys.
pub mod criteria {
    pub const FIRST_IDEA: &str = "FIRST_IDEA";
    pub const IDEAS_5: &str = "IDEAS_5";
    pub const LIKES_RECEIVED_10: &str = "LIKES_RECEIVED_10";
    pub const COMMENTS_10: &str = "COMMENTS_10";
    pub const IDEA_COMPLETED: &str = "IDEA_COMPLETED";
}

/// Actions that earn experience points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XpReason {
    IdeaCreated,
    IdeaCompleted,
    LikeReceived,
    CommentPosted,
}

impl XpReason {
    /// Points awarded for the action.
    #[must_use]
    pub const fn points(self) -> i32 {
        match self {
            Self::IdeaCreated => 50,
            Self::IdeaCompleted => 100,
            Self::LikeReceived => 10,
            Self::CommentPosted => 5,
        }
    }

    /// Badges whose criteria may be met by this action.
    const fn badge_criteria(self) -> &'static [&'static str] {
        match self {
            Self::IdeaCreated => &[criteria::FIRST_IDEA, criteria::IDEAS_5],
            Self::IdeaCompleted => &[criteria::IDEA_COMPLETED],
            Self::LikeReceived => &[criteria::LIKES_RECEIVED_10],
            Self::CommentPosted => &[criteria::COMMENTS_10],
        }
    }
}

/// Level reached with the given XP. Level 1 starts at 0 XP.
#[must_use]
pub const fn level_for_xp(xp: i32) -> i32 {
    let xp = if xp < 0 { 0 } else { xp };
    xp / XP_PER_LEVEL + 1
}

/// A badge and whether the user holds it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    pub xp_reward: i32,
    pub earned: bool,
    pub earned_at: Option<DateTime<FixedOffset>>,
}

/// Gamification service.
#[derive(Clone)]
pub struct GamificationService {
    user_repo: UserRepository,
    badge_repo: BadgeRepository,
    idea_repo: IdeaRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl GamificationService {
    /// Create a new gamification service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        badge_repo: BadgeRepository,
        idea_repo: IdeaRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            user_repo,
            badge_repo,
            idea_repo,
            like_repo,
            comment_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Award XP for an action, then grant any badges it unlocks and update the level.
    pub async fn award<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        reason: XpReason,
    ) -> AppResult<()> {
        self.user_repo.add_xp(conn, user_id, reason.points()).await?;

        for criteria in reason.badge_criteria() {
            self.check_badge(conn, user_id, criteria).await?;
        }

        self.update_level(conn, user_id).await
    }

    async fn update_level<C: ConnectionTrait>(&self, conn: &C, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id_on(conn, user_id).await?;
        let level = level_for_xp(user.xp_points);

        if level > user.level {
            self.user_repo.set_level(conn, user_id, level).await?;
            self.notification_service
                .notify_level_up(conn, user_id, level)
                .await?;
            info!(user_id = %user_id, level = level, "User leveled up");
        }

        Ok(())
    }

    async fn criteria_met<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        key: &str,
    ) -> AppResult<bool> {
        Ok(match key {
            criteria::FIRST_IDEA => self.idea_repo.count_by_author(conn, user_id).await? >= 1,
            criteria::IDEAS_5 => self.idea_repo.count_by_author(conn, user_id).await? >= 5,
            criteria::LIKES_RECEIVED_10 => {
                self.like_repo
                    .count_received_by_author(conn, user_id)
                    .await?
                    >= 10
            }
            criteria::COMMENTS_10 => {
                self.comment_repo.count_by_author(conn, user_id).await? >= 10
            }
            criteria::IDEA_COMPLETED => true,
            _ => false,
        })
    }

    async fn check_badge<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        key: &str,
    ) -> AppResult<()> {
        let Some(badge) = self.badge_repo.find_by_criteria(conn, key).await? else {
            return Ok(());
        };

        if self.badge_repo.has_badge(conn, user_id, &badge.id).await? {
            return Ok(());
        }

        if !self.criteria_met(conn, user_id, key).await? {
            return Ok(());
        }

        let model = user_badge::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            badge_id: Set(badge.id.clone()),
            earned_at: Set(Utc::now().into()),
        };
        self.badge_repo.award(conn, model).await?;

        if badge.xp_reward > 0 {
            self.user_repo.add_xp(conn, user_id, badge.xp_reward).await?;
        }

        self.notification_service
            .notify_badge_earned(conn, user_id, &badge.id, &badge.display_name)
            .await?;

        info!(user_id = %user_id, badge = %badge.name, "Badge earned");
        Ok(())
    }

    /// Every badge with the user's earned status.
    pub async fn badges_for_user(&self, user_id: &str) -> AppResult<Vec<BadgeStatus>> {
        let badges = self.badge_repo.find_all().await?;
        let earned = self.badge_repo.find_earned(user_id).await?;

        Ok(badges
            .into_iter()
            .map(|b: badge::Model| {
                let earned_at = earned
                    .iter()
                    .find(|e| e.badge_id == b.id)
                    .map(|e| e.earned_at);

                BadgeStatus {
                    id: b.id,
                    name: b.name,
                    display_name: b.display_name,
                    description: b.description,
                    icon: b.icon,
                    xp_reward: b.xp_reward,
                    earned: earned_at.is_some(),
                    earned_at,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{
        entities::{NotificationType, badge, user},
        repositories::NotificationRepository,
        test_utils::fixtures,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: Arc<DatabaseConnection>) -> GamificationService {
        GamificationService::new(
            UserRepository::new(db.clone()),
            BadgeRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            NotificationService::new(db.clone(), NotificationRepository::new(db)),
        )
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(250), 3);
        assert_eq!(level_for_xp(-10), 1);
    }

    #[test]
    fn test_xp_amounts() {
        assert_eq!(XpReason::IdeaCreated.points(), 50);
        assert_eq!(XpReason::IdeaCompleted.points(), 100);
        assert_eq!(XpReason::LikeReceived.points(), 10);
        assert_eq!(XpReason::CommentPosted.points(), 5);
    }

    #[tokio::test]
    async fn test_award_levels_up_without_badge() {
        let reached = user::Model {
            xp_points: 100,
            level: 1,
            ..fixtures::user("u1", "alice")
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // LIKES_RECEIVED_10 badge is not seeded
                .append_query_results([Vec::<badge::Model>::new()])
                .append_query_results([[reached]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "u1",
                    NotificationType::LevelUp,
                )]])
                .append_exec_results([exec_ok(), exec_ok()])
                .into_connection(),
        );

        let service = service(db.clone());
        service
            .award(db.as_ref(), "u1", XpReason::LikeReceived)
            .await
            .unwrap();
        drop(service);

        // add_xp, badge lookup, user reload, set_level, notification insert
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 5);
    }

    #[tokio::test]
    async fn test_award_skips_held_badge() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::badge(
                    "badge_completed",
                    criteria::IDEA_COMPLETED,
                    50,
                )]])
                .append_query_results([[fixtures::user_badge(
                    "ub1",
                    "u1",
                    "badge_completed",
                )]])
                .append_query_results([[user::Model {
                    xp_points: 120,
                    level: 2,
                    ..fixtures::user("u1", "alice")
                }]])
                .append_exec_results([exec_ok()])
                .into_connection(),
        );

        let service = service(db.clone());
        service
            .award(db.as_ref(), "u1", XpReason::IdeaCompleted)
            .await
            .unwrap();
        drop(service);

        // add_xp, badge lookup, holder check, user reload
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 4);
    }
}
