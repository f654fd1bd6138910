//! Idea entity.

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdeaStatus {
    #[sea_orm(string_value = "CONCEPT")]
    Concept,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl Default for IdeaStatus {
    fn default() -> Self {
        Self::Concept
    }
}

impl IdeaStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Concept, Self::InProgress, Self::Completed];

    /// Wire and database name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "CONCEPT",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Human readable label used in notifications.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Concept => "Concept",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdeaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONCEPT" => Ok(Self::Concept),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("Invalid status: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idea")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    #[sea_orm(indexed)]
    pub category: String,

    /// Ordered list of tag strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    #[sea_orm(indexed)]
    pub author_id: String,

    pub status: IdeaStatus,

    /// 0-100, driven by the checklist or forced by status transitions.
    #[sea_orm(default_value = 0)]
    pub progress_percentage: i32,

    /// Maintained by a database trigger on `idea_like`.
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    #[sea_orm(default_value = 0)]
    pub comment_count: i32,

    #[sea_orm(default_value = 0)]
    pub view_count: i32,

    #[sea_orm(default_value = false)]
    pub is_featured: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Tags as strings, skipping any non-string JSON values.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::checklist_item::Entity")]
    ChecklistItem,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::idea_like::Entity")]
    Like,
    #[sea_orm(has_many = "super::file_attachment::Entity")]
    FileAttachment,
    #[sea_orm(has_one = "super::idea_group::Entity")]
    Group,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::checklist_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChecklistItem.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::idea_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Like.def()
    }
}

impl Related<super::file_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FileAttachment.def()
    }
}

impl Related<super::idea_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("IN_PROGRESS".parse::<IdeaStatus>().unwrap(), IdeaStatus::InProgress);
        assert!("in_progress".parse::<IdeaStatus>().is_err());
        assert_eq!(IdeaStatus::InProgress.label(), "In Progress");
    }
}
