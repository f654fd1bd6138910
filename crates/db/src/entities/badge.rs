//! Badge catalogue entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "badge")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub name: String,

    pub display_name: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub icon: String,

    /// Machine-readable award rule, e.g. `IDEAS_5`.
    #[sea_orm(unique)]
    pub criteria: String,

    #[sea_orm(default_value = 0)]
    pub xp_reward: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_badge::Entity")]
    UserBadge,
}

impl Related<super::user_badge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserBadge.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
