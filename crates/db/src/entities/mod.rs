//! Database entities.

pub mod audit_log;
pub mod badge;
pub mod checklist_item;
pub mod comment;
pub mod comment_reaction;
pub mod file_attachment;
pub mod group_member;
pub mod group_message;
pub mod group_message_read;
pub mod idea;
pub mod idea_group;
pub mod idea_like;
pub mod notification;
pub mod survey;
pub mod survey_option;
pub mod survey_vote;
pub mod user;
pub mod user_badge;

pub use audit_log::{AuditAction, Entity as AuditLog};
pub use badge::Entity as Badge;
pub use checklist_item::Entity as ChecklistItem;
pub use comment::Entity as Comment;
pub use comment_reaction::Entity as CommentReaction;
pub use file_attachment::Entity as FileAttachment;
pub use group_member::{Entity as GroupMember, GroupRole};
pub use group_message::Entity as GroupMessage;
pub use group_message_read::Entity as GroupMessageRead;
pub use idea::{Entity as Idea, IdeaStatus};
pub use idea_group::Entity as IdeaGroup;
pub use idea_like::Entity as IdeaLike;
pub use notification::{Entity as Notification, NotificationType};
pub use survey::Entity as Survey;
pub use survey_option::Entity as SurveyOption;
pub use survey_vote::Entity as SurveyVote;
pub use user::{Entity as User, UserRole};
pub use user_badge::Entity as UserBadge;
