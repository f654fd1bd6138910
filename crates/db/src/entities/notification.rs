//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    #[sea_orm(string_value = "LIKE")]
    Like,
    #[sea_orm(string_value = "COMMENT")]
    Comment,
    #[sea_orm(string_value = "REACTION")]
    Reaction,
    #[sea_orm(string_value = "STATUS_CHANGE")]
    StatusChange,
    #[sea_orm(string_value = "BADGE_EARNED")]
    BadgeEarned,
    #[sea_orm(string_value = "LEVEL_UP")]
    LevelUp,
    #[sea_orm(string_value = "MENTION")]
    Mention,
    #[sea_orm(string_value = "MESSAGE")]
    Message,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: String,

    /// The user who triggered the notification
    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    pub notification_type: NotificationType,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    /// Client route, e.g. `/ideas/{id}`
    #[sea_orm(nullable)]
    pub link: Option<String>,

    #[sea_orm(nullable)]
    pub related_entity_type: Option<String>,

    #[sea_orm(nullable)]
    pub related_entity_id: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Sender,
}

impl ActiveModelBehavior for ActiveModel {}
