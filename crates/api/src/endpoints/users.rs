//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use ideaboard_common::AppResult;
use ideaboard_core::{BadgeStatus, LikeStatus, UpdateProfileInput, UserResponse};
use ideaboard_db::entities::UserRole;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.user_service.me(&user).await?))
}

async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.user_service.update_me(&user, input).await?))
}

async fn remaining_likes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<LikeStatus>> {
    Ok(ApiResponse::ok(state.like_service.status(&user).await?))
}

async fn badges(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BadgeStatus>>> {
    Ok(ApiResponse::ok(
        state
            .gamification_service
            .badges_for_user(&user.user_id)
            .await?,
    ))
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    Ok(ApiResponse::ok(state.user_service.list(&user).await?))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.user_service.get(&user, &id).await?))
}

async fn update_role(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(
        state.user_service.update_role(&user, &id, req.role).await?,
    ))
}

async fn update_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(
        state
            .user_service
            .update_status(&user, &id, req.is_active)
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/me", get(me).put(update_me))
        .route("/me/likes/remaining", get(remaining_likes))
        .route("/me/badges", get(badges))
        .route("/{id}", get(show))
        .route("/{id}/role", put(update_role))
        .route("/{id}/status", put(update_status))
}
