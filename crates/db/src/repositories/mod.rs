//! Repositories.
//!
//! Read methods run on the repository's own connection. Methods that write, and
//! reads that must observe writes made earlier in the same unit of work, take the
//! connection explicitly so services can pass a transaction.

mod audit_log;
mod badge;
mod checklist;
mod comment;
mod file_attachment;
mod group;
mod idea;
mod like;
mod notification;
mod survey;
mod user;

pub use audit_log::AuditLogRepository;
pub use badge::BadgeRepository;
pub use checklist::ChecklistRepository;
pub use comment::CommentRepository;
pub use file_attachment::FileAttachmentRepository;
pub use group::GroupRepository;
pub use idea::{CategoryCount, DailyCount, IdeaFilter, IdeaRepository, TagCount};
pub use like::{LikeRepository, LikedIdeaCount};
pub use notification::NotificationRepository;
pub use survey::SurveyRepository;
pub use user::UserRepository;

use ideaboard_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map an insert error, turning a unique-index violation into a conflict.
pub(crate) fn map_insert_err(err: DbErr, conflict_message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(conflict_message.to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
