//! Survey entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "survey")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub creator_id: String,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Closed surveys reject votes.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Voter identity is never exposed; kept for clients to label the survey.
    #[sea_orm(default_value = false)]
    pub is_anonymous: bool,

    #[sea_orm(default_value = false)]
    pub allow_multiple_votes: bool,

    /// Maintained by a database trigger on `survey_vote`.
    #[sea_orm(default_value = 0)]
    pub total_votes: i32,

    #[sea_orm(nullable)]
    pub expires_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    #[sea_orm(has_many = "super::survey_option::Entity")]
    Option,
}

impl Related<super::survey_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Option.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
