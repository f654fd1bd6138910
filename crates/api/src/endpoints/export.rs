//! Report download endpoints.

use axum::{Router, extract::State, response::Response, routing::get};
use chrono::Local;
use ideaboard_common::AppResult;

use crate::{extractors::AuthUser, middleware::AppState, response::attachment};

const CSV: &str = "text/csv; charset=utf-8";
const PDF: &str = "application/pdf";

fn filename(stem: &str, ext: &str) -> String {
    format!("{stem}_{}.{ext}", Local::now().format("%Y%m%d"))
}

async fn ideas_csv(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.export_service.ideas_csv(&user).await?;
    Ok(attachment(CSV, &filename("ideas", "csv"), csv.into_bytes()))
}

async fn statistics_csv(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let csv = state.export_service.statistics_csv(&user).await?;
    Ok(attachment(CSV, &filename("statistics", "csv"), csv.into_bytes()))
}

async fn users_csv(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.export_service.users_csv(&user).await?;
    Ok(attachment(CSV, &filename("users", "csv"), csv.into_bytes()))
}

async fn statistics_pdf(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let pdf = state.export_service.statistics_pdf(&user).await?;
    Ok(attachment(PDF, &filename("statistics_report", "pdf"), pdf))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ideas/csv", get(ideas_csv))
        .route("/statistics/csv", get(statistics_csv))
        .route("/users/csv", get(users_csv))
        .route("/statistics/pdf", get(statistics_pdf))
}
