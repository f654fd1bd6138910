//! Idea board server entry point.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use ideaboard_api::{AppState, app};
use ideaboard_common::{Config, LocalStorage};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// `RUST_LOG` filter, plain or JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ideaboard=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting ideaboard server...");

    let config = Config::load().context("failed to load configuration")?;

    let db = ideaboard_db::init(&config.database)
        .await
        .context("failed to connect to database")?;

    let applied = ideaboard_db::migrate(&db)
        .await
        .context("failed to run migrations")?;
    info!(applied, "Database schema up to date");

    tokio::fs::create_dir_all(&config.storage.upload_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create upload directory {}",
                config.storage.upload_dir.display()
            )
        })?;
    let storage = Arc::new(LocalStorage::new(config.storage.upload_dir.clone()));

    let state = AppState::new(Arc::new(db), &config, storage);
    let max_file_size = usize::try_from(config.storage.max_file_size)
        .context("storage.max_file_size does not fit in memory")?;
    let app = app(state, max_file_size).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr()))?;
    info!(%addr, url = %config.server.url, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
