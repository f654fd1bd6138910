//! Dashboard endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use ideaboard_common::AppResult;
use ideaboard_core::{DashboardStatistics, IdeaResponse, SurveyResponse, TopIdea};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct NewIdeasQuery {
    pub limit: Option<u64>,
}

async fn statistics(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardStatistics>> {
    Ok(ApiResponse::ok(state.dashboard_service.statistics().await?))
}

async fn top_ideas(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<TopIdea>>> {
    Ok(ApiResponse::ok(state.dashboard_service.top_ideas(&user).await?))
}

async fn new_ideas(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NewIdeasQuery>,
) -> AppResult<ApiResponse<Vec<IdeaResponse>>> {
    Ok(ApiResponse::ok(
        state.dashboard_service.new_ideas(&user, query.limit).await?,
    ))
}

async fn surveys(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<SurveyResponse>>> {
    Ok(ApiResponse::ok(state.dashboard_service.surveys(&user).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/statistics", get(statistics))
        .route("/top-ideas", get(top_ideas))
        .route("/new-ideas", get(new_ideas))
        .route("/surveys", get(surveys))
}
