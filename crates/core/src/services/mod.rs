//! Business logic services.

#![allow(missing_docs)]

pub mod audit;
pub mod auth;
pub mod checklist;
pub mod comment;
pub mod dashboard;
pub mod export;
pub mod file;
pub mod gamification;
pub mod group;
pub mod idea;
pub mod like;
pub mod notification;
pub mod survey;
pub mod user;

pub use audit::{AuditEntry, AuditLogResponse, AuditService};
pub use auth::{AuthResponse, AuthService, LoginInput, RegisterInput};
pub use checklist::{
    ChecklistItemResponse, ChecklistService, CreateChecklistItemInput, UpdateChecklistItemInput,
};
pub use comment::{CommentResponse, CommentService, CreateCommentInput, ReactionInput};
pub use dashboard::{DailyActivity, DashboardService, DashboardStatistics, TopIdea};
pub use export::ExportService;
pub use file::{FileAttachmentResponse, FileDownload, FileService, UploadInput};
pub use gamification::{BadgeStatus, GamificationService, XpReason};
pub use group::{
    GroupResponse, GroupService, MemberResponse, MembershipStatus, MessageResponse,
    SendMessageInput,
};
pub use idea::{
    CreateIdeaInput, IdeaDetail, IdeaQuery, IdeaResponse, IdeaService, UpdateIdeaInput,
    UpdateStatusInput,
};
pub use like::{LikeService, LikeStatus};
pub use notification::{NotificationResponse, NotificationService};
pub use survey::{CreateSurveyInput, SurveyResponse, SurveyService, VoteInput};
pub use user::{UpdateProfileInput, UserResponse, UserService, UserSummary};
