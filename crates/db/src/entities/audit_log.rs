//! Append-only audit log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    #[sea_orm(string_value = "CREATE")]
    Create,
    #[sea_orm(string_value = "UPDATE")]
    Update,
    #[sea_orm(string_value = "DELETE")]
    Delete,
    #[sea_orm(string_value = "STATUS_CHANGE")]
    StatusChange,
    #[sea_orm(string_value = "LOGIN")]
    Login,
    #[sea_orm(string_value = "LOGOUT")]
    Logout,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Acting user; kept as a plain id so entries survive user changes.
    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    pub action: AuditAction,

    #[sea_orm(indexed)]
    pub entity_type: String,

    #[sea_orm(nullable)]
    pub entity_id: Option<String>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub old_value: Option<Json>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub new_value: Option<Json>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
