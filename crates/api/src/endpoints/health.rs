//! Liveness endpoint.

use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde_json::{Value, json};

use crate::middleware::AppState;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}
