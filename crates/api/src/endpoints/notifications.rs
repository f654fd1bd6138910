//! Notification endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, put},
};
use ideaboard_common::AppResult;
use ideaboard_core::NotificationResponse;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    /// Maximum results (default: 50)
    pub limit: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedReadResponse {
    pub marked_read: u64,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    Ok(ApiResponse::ok(
        state.notification_service.list(&user, query.limit).await?,
    ))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let unread_count = state.notification_service.unread_count(&user).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { unread_count }))
}

async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.notification_service.mark_as_read(&user, &id).await?;
    Ok(response::ok())
}

async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkedReadResponse>> {
    let marked_read = state.notification_service.mark_all_as_read(&user).await?;
    Ok(ApiResponse::ok(MarkedReadResponse { marked_read }))
}

async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.notification_service.delete(&user, &id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_as_read))
        .route("/{id}/read", put(mark_as_read))
        .route("/{id}", delete(remove))
}
