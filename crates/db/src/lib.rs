//! Database layer for the idea board.
//!
//! Entities, migrations (including the like/vote counter triggers) and the
//! repositories the service layer builds on.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use ideaboard_common::{AppError, AppResult, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{info, log::LevelFilter};

/// Open the connection pool described by `config`.
pub async fn init(config: &DatabaseConfig) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(&config.url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let db = Database::connect(options)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply every pending migration and return how many ran.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<usize> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(pending)
}
