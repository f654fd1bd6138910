//! File attachment repository.

use std::sync::Arc;

use ideaboard_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder,
};

use crate::entities::{FileAttachment, file_attachment};

/// Repository for file attachment metadata.
#[derive(Clone)]
pub struct FileAttachmentRepository {
    db: Arc<DatabaseConnection>,
}

impl FileAttachmentRepository {
    /// Create a new file attachment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Attachments of an idea, newest first.
    pub async fn find_by_idea(&self, idea_id: &str) -> AppResult<Vec<file_attachment::Model>> {
        FileAttachment::find()
            .filter(file_attachment::Column::IdeaId.eq(idea_id))
            .order_by(file_attachment::Column::UploadedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get attachment by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<file_attachment::Model> {
        FileAttachment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::not_found("File"))
    }

    /// Create an attachment record.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: file_attachment::ActiveModel,
    ) -> AppResult<file_attachment::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an attachment record.
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<()> {
        FileAttachment::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
