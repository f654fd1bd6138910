//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use ideaboard_common::AppResult;
use ideaboard_core::{AuthResponse, LoginInput, RegisterInput, UserResponse};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let auth = state.auth_service.register(input).await?;
    Ok(ApiResponse::created(auth))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let auth = state.auth_service.login(input).await?;
    Ok(ApiResponse::ok(auth))
}

async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let auth = state.auth_service.refresh(&req.refresh_token).await?;
    Ok(ApiResponse::ok(auth))
}

async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.auth_service.logout(&user).await?;
    Ok(response::ok())
}

async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UserResponse>> {
    Ok(ApiResponse::ok(state.auth_service.me(&user).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
