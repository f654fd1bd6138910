//! Idea file attachments.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{
    AppError, AppResult, IdGenerator, StorageBackend, attachment_key, file_extension,
};
use ideaboard_db::{
    entities::{AuditAction, file_attachment},
    repositories::{FileAttachmentRepository, IdeaRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    Principal,
    services::audit::{AuditEntry, AuditService, entity_type},
};

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
    "text/csv",
];

/// Check a MIME type against the allow-list, ignoring parameters and case.
#[must_use]
pub fn is_allowed_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_MIME_TYPES.contains(&essence.as_str())
}

/// An uploaded file.
pub struct UploadInput {
    pub original_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Attachment metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachmentResponse {
    pub id: String,
    pub idea_id: String,
    pub uploaded_by: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<FixedOffset>,
}

impl From<file_attachment::Model> for FileAttachmentResponse {
    fn from(m: file_attachment::Model) -> Self {
        Self {
            id: m.id,
            idea_id: m.idea_id,
            uploaded_by: m.uploaded_by,
            filename: m.filename,
            original_name: m.original_name,
            mime_type: m.mime_type,
            file_size: m.file_size,
            uploaded_at: m.uploaded_at,
        }
    }
}

/// File contents with the metadata needed to serve them.
#[derive(Debug)]
pub struct FileDownload {
    pub original_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// File attachment service.
#[derive(Clone)]
pub struct FileService {
    db: Arc<DatabaseConnection>,
    file_repo: FileAttachmentRepository,
    idea_repo: IdeaRepository,
    audit_service: AuditService,
    storage: Arc<dyn StorageBackend>,
    max_file_size: u64,
    id_gen: IdGenerator,
}

impl FileService {
    /// Create a new file service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        file_repo: FileAttachmentRepository,
        idea_repo: IdeaRepository,
        audit_service: AuditService,
        storage: Arc<dyn StorageBackend>,
        max_file_size: u64,
    ) -> Self {
        Self {
            db,
            file_repo,
            idea_repo,
            audit_service,
            storage,
            max_file_size,
            id_gen: IdGenerator::new(),
        }
    }

    fn validate_upload(&self, input: &UploadInput) -> AppResult<()> {
        if input.data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }
        if input.data.len() as u64 > self.max_file_size {
            return Err(AppError::BadRequest(format!(
                "File size exceeds the maximum of {} MB",
                self.max_file_size / (1024 * 1024)
            )));
        }
        if !is_allowed_mime(&input.mime_type) {
            return Err(AppError::BadRequest(format!(
                "File type not allowed: {}",
                input.mime_type
            )));
        }
        Ok(())
    }

    /// Attachments of an idea.
    pub async fn list(&self, idea_id: &str) -> AppResult<Vec<FileAttachmentResponse>> {
        self.idea_repo.get_by_id(idea_id).await?;
        let files = self.file_repo.find_by_idea(idea_id).await?;
        Ok(files.into_iter().map(Into::into).collect())
    }

    /// Store an upload. Idea author only.
    pub async fn upload(
        &self,
        principal: &Principal,
        idea_id: &str,
        input: UploadInput,
    ) -> AppResult<FileAttachmentResponse> {
        self.validate_upload(&input)?;

        let idea = self.idea_repo.get_by_id(idea_id).await?;
        if idea.author_id != principal.user_id {
            return Err(AppError::Forbidden(
                "Only the idea author can upload files".to_string(),
            ));
        }

        let filename = format!(
            "{}{}",
            self.id_gen.generate_uuid_v4(),
            file_extension(&input.original_name)
        );
        let key = attachment_key(&idea.id, &filename);
        let stored = self.storage.put(&key, &input.data).await?;

        let model = file_attachment::ActiveModel {
            id: Set(self.id_gen.generate()),
            idea_id: Set(idea.id.clone()),
            uploaded_by: Set(principal.user_id.clone()),
            filename: Set(filename),
            original_name: Set(input.original_name),
            file_path: Set(stored.key.clone()),
            mime_type: Set(input.mime_type),
            file_size: Set(i64::try_from(stored.size).unwrap_or(i64::MAX)),
            uploaded_at: Set(Utc::now().into()),
        };

        let result = async {
            let txn = self
                .db
                .begin()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let file = self.file_repo.create(&txn, model).await?;
            self.audit_service
                .record(
                    &txn,
                    AuditEntry::new(AuditAction::Create, entity_type::FILE, &file.id)
                        .by(&principal.user_id)
                        .new_value(json!({ "ideaId": file.idea_id, "name": file.original_name })),
                )
                .await?;
            txn.commit()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok::<_, AppError>(file)
        }
        .await;

        match result {
            Ok(file) => {
                info!(file_id = %file.id, idea_id = %file.idea_id, size = file.file_size, "File uploaded");
                Ok(file.into())
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored.key).await {
                    warn!(key = %stored.key, error = %cleanup, "Failed to remove orphaned upload");
                }
                Err(e)
            }
        }
    }

    /// Read an attachment. It must belong to `idea_id`.
    pub async fn download(&self, idea_id: &str, file_id: &str) -> AppResult<FileDownload> {
        let file = self.file_repo.get_by_id(file_id).await?;
        if file.idea_id != idea_id {
            return Err(AppError::not_found("File"));
        }

        let data = self.storage.get(&file.file_path).await?;

        Ok(FileDownload {
            original_name: file.original_name,
            mime_type: file.mime_type,
            data,
        })
    }

    /// Remove an attachment. Uploader, idea author or admin only.
    pub async fn delete(&self, principal: &Principal, idea_id: &str, file_id: &str) -> AppResult<()> {
        let file = self.file_repo.get_by_id(file_id).await?;
        if file.idea_id != idea_id {
            return Err(AppError::not_found("File"));
        }

        let idea = self.idea_repo.get_by_id(idea_id).await?;
        if !(principal.is_self_or_admin(&file.uploaded_by) || idea.author_id == principal.user_id)
        {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this file".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        self.file_repo.delete(&txn, &file.id).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Delete, entity_type::FILE, &file.id)
                    .by(&principal.user_id)
                    .old(json!({ "ideaId": file.idea_id, "name": file.original_name })),
            )
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Err(e) = self.storage.delete(&file.file_path).await {
            warn!(key = %file.file_path, error = %e, "Failed to remove stored file");
        }

        info!(file_id = %file.id, "File deleted");
        Ok(())
    }
}
