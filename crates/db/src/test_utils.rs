//! Test utilities for database operations.
//!
//! Model builders used by the repository and service tests together with
//! `sea_orm::MockDatabase`.

/// Entity model fixtures with sensible defaults.
pub mod fixtures {
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use serde_json::json;

    use crate::entities::{
        AuditAction, GroupRole, IdeaStatus, NotificationType, UserRole, audit_log, badge,
        checklist_item, comment, comment_reaction, file_attachment, group_member, group_message,
        idea, idea_group, idea_like, notification, survey, survey_option, survey_vote, user,
        user_badge,
    };

    /// Fixed timestamp shared by all fixtures.
    #[must_use]
    pub fn timestamp() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 3, 12, 9, 30, 0)
            .single()
            .unwrap_or_default()
            .fixed_offset()
    }

    #[must_use]
    pub fn user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            avatar_url: None,
            role: UserRole::Employee,
            is_active: true,
            xp_points: 0,
            level: 1,
            last_login: None,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    /// A user with the given role.
    #[must_use]
    pub fn user_with_role(id: &str, username: &str, role: UserRole) -> user::Model {
        user::Model {
            role,
            ..user(id, username)
        }
    }

    #[must_use]
    pub fn idea(id: &str, author_id: &str, title: &str) -> idea::Model {
        idea::Model {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("Description of {title}"),
            category: "Process".to_string(),
            tags: json!(["green"]),
            author_id: author_id.to_string(),
            status: IdeaStatus::Concept,
            progress_percentage: 0,
            like_count: 0,
            comment_count: 0,
            view_count: 0,
            is_featured: false,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[must_use]
    pub fn checklist_item(
        id: &str,
        idea_id: &str,
        ordinal_position: i32,
        is_completed: bool,
    ) -> checklist_item::Model {
        checklist_item::Model {
            id: id.to_string(),
            idea_id: idea_id.to_string(),
            title: format!("Step {ordinal_position}"),
            is_completed,
            ordinal_position,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[must_use]
    pub fn like(id: &str, user_id: &str, idea_id: &str) -> idea_like::Model {
        idea_like::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            idea_id: idea_id.to_string(),
            created_at: timestamp(),
        }
    }

    #[must_use]
    pub fn comment(id: &str, idea_id: &str, author_id: &str, content: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            idea_id: idea_id.to_string(),
            author_id: author_id.to_string(),
            content: content.to_string(),
            reaction_count: 0,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[must_use]
    pub fn reaction(
        id: &str,
        comment_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> comment_reaction::Model {
        comment_reaction::Model {
            id: id.to_string(),
            comment_id: comment_id.to_string(),
            user_id: user_id.to_string(),
            emoji: emoji.to_string(),
            created_at: timestamp(),
        }
    }

    #[must_use]
    pub fn file_attachment(id: &str, idea_id: &str, uploaded_by: &str) -> file_attachment::Model {
        file_attachment::Model {
            id: id.to_string(),
            idea_id: idea_id.to_string(),
            uploaded_by: uploaded_by.to_string(),
            filename: format!("{id}.pdf"),
            original_name: "plan.pdf".to_string(),
            file_path: format!("{idea_id}/{id}.pdf"),
            mime_type: "application/pdf".to_string(),
            file_size: 1024,
            uploaded_at: timestamp(),
        }
    }

    #[must_use]
    pub fn group(id: &str, idea_id: &str, created_by: &str) -> idea_group::Model {
        idea_group::Model {
            id: id.to_string(),
            idea_id: idea_id.to_string(),
            name: "Group: Test".to_string(),
            description: Some("Discussion group for idea: Test".to_string()),
            created_by: created_by.to_string(),
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    #[must_use]
    pub fn group_member(
        id: &str,
        group_id: &str,
        user_id: &str,
        role: GroupRole,
    ) -> group_member::Model {
        group_member::Model {
            id: id.to_string(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: timestamp(),
        }
    }

    #[must_use]
    pub fn group_message(
        id: &str,
        group_id: &str,
        sender_id: &str,
        content: &str,
    ) -> group_message::Model {
        group_message::Model {
            id: id.to_string(),
            group_id: group_id.to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: timestamp(),
        }
    }

    #[must_use]
    pub fn survey(id: &str, creator_id: &str) -> survey::Model {
        survey::Model {
            id: id.to_string(),
            creator_id: creator_id.to_string(),
            question: "Where should we meet?".to_string(),
            description: None,
            is_active: true,
            is_anonymous: false,
            allow_multiple_votes: false,
            total_votes: 0,
            expires_at: None,
            created_at: timestamp(),
        }
    }

    #[must_use]
    pub fn survey_option(
        id: &str,
        survey_id: &str,
        option_text: &str,
        display_order: i32,
    ) -> survey_option::Model {
        survey_option::Model {
            id: id.to_string(),
            survey_id: survey_id.to_string(),
            option_text: option_text.to_string(),
            vote_count: 0,
            display_order,
        }
    }

    #[must_use]
    pub fn survey_vote(
        id: &str,
        survey_id: &str,
        option_id: &str,
        user_id: &str,
    ) -> survey_vote::Model {
        survey_vote::Model {
            id: id.to_string(),
            survey_id: survey_id.to_string(),
            option_id: option_id.to_string(),
            user_id: user_id.to_string(),
            voted_at: timestamp(),
        }
    }

    #[must_use]
    pub fn notification(
        id: &str,
        user_id: &str,
        notification_type: NotificationType,
    ) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            sender_id: None,
            notification_type,
            title: "Title".to_string(),
            message: "Message".to_string(),
            link: None,
            related_entity_type: None,
            related_entity_id: None,
            is_read: false,
            created_at: timestamp(),
        }
    }

    #[must_use]
    pub fn badge(id: &str, criteria: &str, xp_reward: i32) -> badge::Model {
        badge::Model {
            id: id.to_string(),
            name: criteria.to_lowercase(),
            display_name: criteria.to_string(),
            description: String::new(),
            icon: "star".to_string(),
            criteria: criteria.to_string(),
            xp_reward,
        }
    }

    #[must_use]
    pub fn user_badge(id: &str, user_id: &str, badge_id: &str) -> user_badge::Model {
        user_badge::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            badge_id: badge_id.to_string(),
            earned_at: timestamp(),
        }
    }

    #[must_use]
    pub fn audit_entry(
        id: &str,
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
    ) -> audit_log::Model {
        audit_log::Model {
            id: id.to_string(),
            user_id: None,
            action,
            entity_type: entity_type.to_string(),
            entity_id: Some(entity_id.to_string()),
            old_value: None,
            new_value: None,
            created_at: timestamp(),
        }
    }
}
