//! Notification service.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{
        IdeaStatus,
        notification::{self, NotificationType},
    },
    repositories::NotificationRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;

use crate::Principal;

/// Default page size for notification listings.
pub const DEFAULT_NOTIFICATION_LIMIT: u64 = 50;

/// Notification as returned to its recipient.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub sender_id: Option<String>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<FixedOffset>,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title,
            message: n.message,
            link: n.link,
            sender_id: n.sender_id,
            related_entity_type: n.related_entity_type,
            related_entity_id: n.related_entity_id,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

struct NewNotification<'a> {
    user_id: &'a str,
    sender_id: Option<&'a str>,
    notification_type: NotificationType,
    title: &'a str,
    message: String,
    link: Option<String>,
    related: Option<(&'a str, &'a str)>,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, notification_repo: NotificationRepository) -> Self {
        Self {
            db,
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    async fn create_internal<C: ConnectionTrait>(
        &self,
        conn: &C,
        n: NewNotification<'_>,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(n.user_id.to_string()),
            sender_id: Set(n.sender_id.map(ToString::to_string)),
            notification_type: Set(n.notification_type),
            title: Set(n.title.to_string()),
            message: Set(n.message),
            link: Set(n.link),
            related_entity_type: Set(n.related.map(|(t, _)| t.to_string())),
            related_entity_id: Set(n.related.map(|(_, id)| id.to_string())),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        self.notification_repo.create(conn, model).await
    }

    /// Notify an idea author that their idea was liked.
    pub async fn notify_like<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
        liker: &Principal,
        idea_id: &str,
        idea_title: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: author_id,
                sender_id: Some(&liker.user_id),
                notification_type: NotificationType::Like,
                title: "New Like",
                message: format!("{} liked your idea \"{idea_title}\"", liker.username),
                link: Some(format!("/ideas/{idea_id}")),
                related: Some(("IDEA", idea_id)),
            },
        )
        .await
    }

    /// Notify an idea author about a new comment.
    pub async fn notify_comment<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
        commenter: &Principal,
        idea_id: &str,
        idea_title: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: author_id,
                sender_id: Some(&commenter.user_id),
                notification_type: NotificationType::Comment,
                title: "New Comment",
                message: format!(
                    "{} commented on your idea \"{idea_title}\"",
                    commenter.username
                ),
                link: Some(format!("/ideas/{idea_id}")),
                related: Some(("IDEA", idea_id)),
            },
        )
        .await
    }

    /// Notify a comment author about a reaction.
    pub async fn notify_reaction<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_author_id: &str,
        reactor: &Principal,
        idea_id: &str,
        comment_id: &str,
        emoji: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: comment_author_id,
                sender_id: Some(&reactor.user_id),
                notification_type: NotificationType::Reaction,
                title: "New Reaction",
                message: format!("{} reacted {emoji} to your comment", reactor.username),
                link: Some(format!("/ideas/{idea_id}")),
                related: Some(("COMMENT", comment_id)),
            },
        )
        .await
    }

    /// Notify an idea author that the idea's status changed.
    pub async fn notify_status_change<C: ConnectionTrait>(
        &self,
        conn: &C,
        author_id: &str,
        changed_by: &Principal,
        idea_id: &str,
        idea_title: &str,
        status: IdeaStatus,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: author_id,
                sender_id: Some(&changed_by.user_id),
                notification_type: NotificationType::StatusChange,
                title: "Status Updated",
                message: format!(
                    "Your idea \"{idea_title}\" is now {}",
                    status.label()
                ),
                link: Some(format!("/ideas/{idea_id}")),
                related: Some(("IDEA", idea_id)),
            },
        )
        .await
    }

    /// Notify a user that they earned a badge.
    pub async fn notify_badge_earned<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        badge_id: &str,
        badge_name: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id,
                sender_id: None,
                notification_type: NotificationType::BadgeEarned,
                title: "Badge Earned!",
                message: format!("You earned the \"{badge_name}\" badge"),
                link: Some("/profile".to_string()),
                related: Some(("BADGE", badge_id)),
            },
        )
        .await
    }

    /// Notify a user that they reached a new level.
    pub async fn notify_level_up<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        level: i32,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id,
                sender_id: None,
                notification_type: NotificationType::LevelUp,
                title: "Level Up!",
                message: format!("Congratulations! You reached level {level}"),
                link: Some("/profile".to_string()),
                related: None,
            },
        )
        .await
    }

    /// Notify a group creator that someone joined.
    pub async fn notify_group_join<C: ConnectionTrait>(
        &self,
        conn: &C,
        creator_id: &str,
        joiner: &Principal,
        group_id: &str,
        group_name: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: creator_id,
                sender_id: Some(&joiner.user_id),
                notification_type: NotificationType::Message,
                title: "New Group Member",
                message: format!("{} joined the group \"{group_name}\"", joiner.username),
                link: Some(format!("/groups/{group_id}")),
                related: Some(("GROUP", group_id)),
            },
        )
        .await
    }

    /// Notify a group member about a new message.
    pub async fn notify_group_message<C: ConnectionTrait>(
        &self,
        conn: &C,
        member_id: &str,
        sender: &Principal,
        group_id: &str,
        group_name: &str,
        preview: &str,
    ) -> AppResult<notification::Model> {
        self.create_internal(
            conn,
            NewNotification {
                user_id: member_id,
                sender_id: Some(&sender.user_id),
                notification_type: NotificationType::Message,
                title: "New Group Message",
                message: format!("{} in \"{group_name}\": {preview}", sender.username),
                link: Some(format!("/groups/{group_id}")),
                related: Some(("GROUP", group_id)),
            },
        )
        .await
    }

    /// Notifications for the caller, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        limit: Option<u64>,
    ) -> AppResult<Vec<NotificationResponse>> {
        let limit = limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, 100);

        let notifications = self
            .notification_repo
            .find_by_user(&principal.user_id, limit)
            .await?;

        Ok(notifications.into_iter().map(Into::into).collect())
    }

    /// Count the caller's unread notifications.
    pub async fn unread_count(&self, principal: &Principal) -> AppResult<u64> {
        self.notification_repo.count_unread(&principal.user_id).await
    }

    async fn get_owned(
        &self,
        principal: &Principal,
        id: &str,
    ) -> AppResult<notification::Model> {
        let notification = self.notification_repo.get_by_id(id).await?;

        if notification.user_id != principal.user_id {
            return Err(AppError::Forbidden(
                "You can only access your own notifications".to_string(),
            ));
        }

        Ok(notification)
    }

    /// Mark one of the caller's notifications as read.
    pub async fn mark_as_read(&self, principal: &Principal, id: &str) -> AppResult<()> {
        self.get_owned(principal, id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.notification_repo.mark_as_read(&txn, id).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark all of the caller's notifications as read.
    pub async fn mark_all_as_read(&self, principal: &Principal) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let updated = self
            .notification_repo
            .mark_all_as_read(&txn, &principal.user_id)
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Delete one of the caller's notifications.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        self.get_owned(principal, id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.notification_repo.delete(&txn, id).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
