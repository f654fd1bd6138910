//! Audit log endpoint.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use ideaboard_common::AppResult;
use ideaboard_core::AuditLogResponse;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub limit: Option<u64>,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<ApiResponse<Vec<AuditLogResponse>>> {
    Ok(ApiResponse::ok(
        state
            .audit_service
            .list(&user, query.entity_type.as_deref(), query.limit)
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}
