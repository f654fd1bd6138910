//! Group member entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    /// The idea's author. Cannot leave the group.
    #[sea_orm(string_value = "CREATOR")]
    Creator,
    /// Anyone who joined.
    #[sea_orm(string_value = "MEMBER")]
    Member,
}

impl Default for GroupRole {
    fn default() -> Self {
        Self::Member
    }
}

impl GroupRole {
    /// Check if this is the creator role.
    #[must_use]
    pub const fn is_creator(&self) -> bool {
        matches!(self, Self::Creator)
    }
}

/// Group member - tracks which users are in which groups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub role: GroupRole,

    pub joined_at: DateTimeWithTimeZone,
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
        belongs_to = "super::idea_group::Entity",
        from = "Column::GroupId",
        to = "super::idea_group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::idea_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
