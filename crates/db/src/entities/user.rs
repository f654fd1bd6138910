//! User entity.

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Regular employee.
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
    /// Project manager - may change idea status and export reports.
    #[sea_orm(string_value = "PROJECT_MANAGER")]
    ProjectManager,
    /// Administrator - may act as any role.
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Employee
    }
}

impl UserRole {
    /// Wire and database name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "EMPLOYEE",
            Self::ProjectManager => "PROJECT_MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Check if this is the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Project managers and admins may change idea status and export data.
    #[must_use]
    pub const fn is_manager(&self) -> bool {
        matches!(self, Self::ProjectManager | Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMPLOYEE" => Ok(Self::Employee),
            "PROJECT_MANAGER" => Ok(Self::ProjectManager),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    pub role: UserRole,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_value = 0)]
    pub xp_points: i32,

    #[sea_orm(default_value = 1)]
    pub level: i32,

    #[sea_orm(nullable)]
    pub last_login: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::idea::Entity")]
    Idea,
    #[sea_orm(has_many = "super::user_badge::Entity")]
    UserBadge,
}

impl Related<super::idea::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Idea.def()
    }
}

impl Related<super::user_badge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserBadge.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
