//! Idea endpoints, including likes, comments, checklist and attachments.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use ideaboard_common::{AppError, AppResult};
use ideaboard_core::{
    ChecklistItemResponse, CommentResponse, CreateChecklistItemInput, CreateCommentInput,
    CreateIdeaInput, FileAttachmentResponse, IdeaDetail, IdeaQuery, IdeaResponse, LikeStatus,
    Page, UpdateChecklistItemInput, UpdateIdeaInput, UpdateStatusInput, UploadInput,
};
use ideaboard_db::repositories::TagCount;
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{self, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}

// ==================== Ideas ====================

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<IdeaQuery>,
) -> AppResult<ApiResponse<Page<IdeaResponse>>> {
    Ok(ApiResponse::ok(state.idea_service.list(&user, query).await?))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateIdeaInput>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state.idea_service.create(&user, input).await?;
    Ok(ApiResponse::created(idea))
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<IdeaDetail>> {
    Ok(ApiResponse::ok(state.idea_service.get(&user, &id).await?))
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateIdeaInput>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    Ok(ApiResponse::ok(
        state.idea_service.update(&user, &id, input).await?,
    ))
}

async fn update_status(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateStatusInput>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    Ok(ApiResponse::ok(
        state
            .idea_service
            .update_status(&user, &id, input.status)
            .await?,
    ))
}

async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.idea_service.delete(&user, &id).await?;
    Ok(response::ok())
}

async fn categories(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::ok(state.idea_service.categories().await?))
}

async fn popular_tags(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<TagCount>>> {
    Ok(ApiResponse::ok(
        state.idea_service.popular_tags(query.limit).await?,
    ))
}

async fn top(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<IdeaResponse>>> {
    Ok(ApiResponse::ok(
        state.idea_service.top_by_likes(&user, query.limit).await?,
    ))
}

async fn newest(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<ApiResponse<Vec<IdeaResponse>>> {
    Ok(ApiResponse::ok(
        state.idea_service.newest(&user, query.limit).await?,
    ))
}

// ==================== Likes ====================

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeStatus>> {
    Ok(ApiResponse::ok(state.like_service.like(&user, &id).await?))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LikeStatus>> {
    Ok(ApiResponse::ok(state.like_service.unlike(&user, &id).await?))
}

// ==================== Comments ====================

async fn comments(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<CommentResponse>>> {
    Ok(ApiResponse::ok(state.comment_service.list(&user, &id).await?))
}

async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state.comment_service.create(&user, &id, input).await?;
    Ok(ApiResponse::created(comment))
}

async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.comment_service.delete(&user, &id, &comment_id).await?;
    Ok(response::ok())
}

// ==================== Checklist ====================

async fn checklist(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<ChecklistItemResponse>>> {
    Ok(ApiResponse::ok(state.checklist_service.list(&id).await?))
}

async fn create_checklist_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<CreateChecklistItemInput>,
) -> AppResult<ApiResponse<ChecklistItemResponse>> {
    let item = state.checklist_service.create(&user, &id, input).await?;
    Ok(ApiResponse::created(item))
}

async fn toggle_checklist_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<ChecklistItemResponse>> {
    Ok(ApiResponse::ok(
        state.checklist_service.toggle(&user, &id, &item_id).await?,
    ))
}

async fn update_checklist_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(input): Json<UpdateChecklistItemInput>,
) -> AppResult<ApiResponse<ChecklistItemResponse>> {
    Ok(ApiResponse::ok(
        state
            .checklist_service
            .update(&user, &id, &item_id, input)
            .await?,
    ))
}

async fn delete_checklist_item(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.checklist_service.delete(&user, &id, &item_id).await?;
    Ok(response::ok())
}

// ==================== Files ====================

async fn files(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<FileAttachmentResponse>>> {
    Ok(ApiResponse::ok(state.file_service.list(&id).await?))
}

/// Upload the multipart `file` field.
async fn upload_file(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<FileAttachmentResponse>> {
    let mut upload: Option<UploadInput> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("file").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .to_vec();

        upload = Some(UploadInput {
            original_name,
            mime_type,
            data,
        });
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let attachment = state.file_service.upload(&user, &id, upload).await?;
    Ok(ApiResponse::created(attachment))
}

async fn download_file(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let file = state.file_service.download(&id, &file_id).await?;
    Ok(response::attachment(
        &file.mime_type,
        &file.original_name,
        file.data,
    ))
}

async fn delete_file(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.file_service.delete(&user, &id, &file_id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/categories", get(categories))
        .route("/tags/popular", get(popular_tags))
        .route("/top", get(top))
        .route("/newest", get(newest))
        .route("/{id}", get(show).put(update).delete(delete))
        .route("/{id}/status", put(update_status))
        // Likes
        .route("/{id}/like", post(like).delete(unlike))
        // Comments
        .route("/{id}/comments", get(comments).post(create_comment))
        .route(
            "/{id}/comments/{comment_id}",
            axum::routing::delete(delete_comment),
        )
        // Checklist
        .route(
            "/{id}/checklist",
            get(checklist).post(create_checklist_item),
        )
        .route(
            "/{id}/checklist/{item_id}",
            put(update_checklist_item).delete(delete_checklist_item),
        )
        .route(
            "/{id}/checklist/{item_id}/toggle",
            patch(toggle_checklist_item),
        )
        // Files
        .route("/{id}/files", get(files).post(upload_file))
        .route(
            "/{id}/files/{file_id}",
            get(download_file).delete(delete_file),
        )
}
