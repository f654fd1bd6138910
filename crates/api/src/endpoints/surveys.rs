//! Survey endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use ideaboard_common::AppResult;
use ideaboard_core::{CreateSurveyInput, SurveyResponse, VoteInput};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<SurveyResponse>>> {
    Ok(ApiResponse::ok(state.survey_service.list(&user).await?))
}

async fn active(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<SurveyResponse>>> {
    Ok(ApiResponse::ok(state.survey_service.active(&user).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateSurveyInput>,
) -> AppResult<ApiResponse<SurveyResponse>> {
    let survey = state.survey_service.create(&user, input).await?;
    Ok(ApiResponse::created(survey))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SurveyResponse>> {
    Ok(ApiResponse::ok(state.survey_service.get(&user, &id).await?))
}

async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<VoteInput>,
) -> AppResult<ApiResponse<SurveyResponse>> {
    Ok(ApiResponse::ok(
        state.survey_service.vote(&user, &id, input).await?,
    ))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.survey_service.delete(&user, &id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/active", get(active))
        .route("/{id}", get(show).delete(delete))
        .route("/{id}/vote", post(vote))
}
