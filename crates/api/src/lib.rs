//! HTTP API layer for the idea board.
//!
//! - **Endpoints**: REST resources nested under `/api`
//! - **Extractors**: the authenticated caller as a [`ideaboard_core::Principal`]
//! - **Middleware**: bearer token resolution and CORS
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, extract::DefaultBodyLimit};
use ideaboard_common::AppError;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware, cors_layer};

/// Extra request body allowance on top of the file size limit for multipart framing.
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

async fn not_found() -> AppError {
    AppError::not_found("Resource")
}

/// The full application: `/api` routes behind authentication and CORS.
pub fn app(state: AppState, max_file_size: usize) -> Router {
    Router::new()
        .nest("/api", router())
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_file_size.saturating_add(MULTIPART_OVERHEAD)))
        .layer(cors_layer())
        .with_state(state)
}
