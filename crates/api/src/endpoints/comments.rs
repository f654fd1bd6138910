//! Comment reaction endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use ideaboard_common::AppResult;
use ideaboard_core::{CommentResponse, ReactionInput};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

async fn add_reaction(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReactionInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    Ok(ApiResponse::ok(
        state.comment_service.add_reaction(&user, &id, input).await?,
    ))
}

async fn remove_reaction(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, emoji)): Path<(String, String)>,
) -> AppResult<ApiResponse<CommentResponse>> {
    Ok(ApiResponse::ok(
        state
            .comment_service
            .remove_reaction(&user, &id, &emoji)
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/reactions", post(add_reaction))
        .route("/{id}/reactions/{emoji}", delete(remove_reaction))
}
