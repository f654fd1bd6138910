//! Checklist item entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A checklist step belonging to one idea.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checklist_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub idea_id: String,

    pub title: String,

    #[sea_orm(default_value = false)]
    pub is_completed: bool,

    /// Display order within the idea, starting at 0.
    pub ordinal_position: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::idea::Entity",
        from = "Column::IdeaId",
        to = "super::idea::Column::Id",
        on_delete = "Cascade"
    )]
    Idea,
}

impl Related<super::idea::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Idea.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
