//! API endpoints.

mod audit;
mod auth;
mod comments;
mod dashboard;
mod export;
mod groups;
mod health;
mod ideas;
mod notifications;
mod surveys;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router, to be nested under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/health", health::router())
        .nest("/auth", auth::router())
        .nest("/ideas", ideas::router())
        .nest("/comments", comments::router())
        .nest("/groups", groups::router())
        .nest("/users", users::router())
        .nest("/dashboard", dashboard::router())
        .nest("/surveys", surveys::router())
        .nest("/notifications", notifications::router())
        .nest("/export", export::router())
        .nest("/audit", audit::router())
}
