//! File attachment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata of a file stored on disk for an idea.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_attachment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub idea_id: String,

    pub uploaded_by: String,

    /// Generated file name on disk.
    pub filename: String,

    /// Name supplied by the uploader.
    pub original_name: String,

    /// Storage key relative to the upload directory.
    pub file_path: String,

    pub mime_type: String,

    pub file_size: i64,

    pub uploaded_at: DateTimeWithTimeZone,
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
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UploadedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Uploader,
}

impl Related<super::idea::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Idea.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
