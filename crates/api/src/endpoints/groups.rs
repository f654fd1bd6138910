//! Idea discussion group endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use ideaboard_common::AppResult;
use ideaboard_core::{GroupResponse, MembershipStatus, MessageResponse, SendMessageInput};
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

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
) -> AppResult<ApiResponse<Vec<GroupResponse>>> {
    Ok(ApiResponse::ok(state.group_service.user_groups(&user).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    Ok(ApiResponse::ok(state.group_service.get_group(&user, &id).await?))
}

async fn show_by_idea(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(idea_id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    Ok(ApiResponse::ok(
        state.group_service.get_group_by_idea(&user, &idea_id).await?,
    ))
}

async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    Ok(ApiResponse::ok(state.group_service.join(&user, &id).await?))
}

async fn join_by_idea(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(idea_id): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    Ok(ApiResponse::ok(
        state.group_service.join_by_idea(&user, &idea_id).await?,
    ))
}

async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.group_service.leave(&user, &id).await?;
    Ok(response::ok())
}

async fn messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    Ok(ApiResponse::ok(state.group_service.messages(&user, &id).await?))
}

async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<SendMessageInput>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state.group_service.send_message(&user, &id, input).await?;
    Ok(ApiResponse::created(message))
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MarkedReadResponse>> {
    let marked_read = state.group_service.mark_all_read(&user, &id).await?;
    Ok(ApiResponse::ok(MarkedReadResponse { marked_read }))
}

async fn membership(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MembershipStatus>> {
    Ok(ApiResponse::ok(state.group_service.membership(&user, &id).await?))
}

async fn membership_by_idea(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(idea_id): Path<String>,
) -> AppResult<ApiResponse<MembershipStatus>> {
    Ok(ApiResponse::ok(
        state
            .group_service
            .membership_by_idea(&user, &idea_id)
            .await?,
    ))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let unread_count = state.group_service.unread_count(&user).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { unread_count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/idea/{idea_id}", get(show_by_idea))
        .route("/idea/{idea_id}/join", post(join_by_idea))
        .route("/idea/{idea_id}/membership", get(membership_by_idea))
        .route("/{id}", get(show))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", delete(leave))
        .route("/{id}/messages", get(messages).post(send_message))
        .route("/{id}/messages/read", put(mark_all_read))
        .route("/{id}/membership", get(membership))
}
