//! Idea group service: membership and messaging.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{GroupRole, group_member, group_message, group_message_read, idea, idea_group},
    repositories::{GroupRepository, IdeaRepository, UserRepository},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Principal,
    services::{
        notification::NotificationService,
        user::{UserSummary, load_summaries},
    },
};

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Characters of a message quoted in notifications.
const PREVIEW_LENGTH: usize = 50;

const NOT_A_MEMBER: &str = "You are not a member of this group";

/// Input for posting a message.
#[derive(Debug, Deserialize)]
pub struct SendMessageInput {
    pub content: String,
}

/// A group member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: String,
    pub user: Option<UserSummary>,
    pub role: GroupRole,
    pub joined_at: DateTime<FixedOffset>,
}

/// A group message with the caller's read state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub group_id: String,
    pub sender: Option<UserSummary>,
    pub content: String,
    pub created_at: DateTime<FixedOffset>,
    pub is_read: bool,
}

/// A group with aggregate information for the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub idea_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub member_count: u64,
    pub unread_count: u64,
    pub last_message: Option<MessageResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberResponse>>,
}

/// Whether the caller belongs to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipStatus {
    pub is_member: bool,
}

/// Trim and check message content.
pub fn normalize_message(content: &str) -> AppResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Message content is required".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Message must be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(content.to_string())
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LENGTH {
        content.to_string()
    } else {
        let cut: String = content.chars().take(PREVIEW_LENGTH).collect();
        format!("{cut}...")
    }
}

/// Group service.
#[derive(Clone)]
pub struct GroupService {
    db: Arc<DatabaseConnection>,
    group_repo: GroupRepository,
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        group_repo: GroupRepository,
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            db,
            group_repo,
            idea_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create the discussion group of a new idea with its author as creator.
    pub async fn create_for_idea<C: ConnectionTrait>(
        &self,
        conn: &C,
        idea: &idea::Model,
    ) -> AppResult<idea_group::Model> {
        let now = Utc::now();

        let group = self
            .group_repo
            .create(
                conn,
                idea_group::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    idea_id: Set(idea.id.clone()),
                    name: Set(format!("Group: {}", idea.title)),
                    description: Set(Some(format!(
                        "Discussion group for idea: {}",
                        idea.title
                    ))),
                    created_by: Set(idea.author_id.clone()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                },
            )
            .await?;

        self.group_repo
            .add_member(
                conn,
                group_member::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group.id.clone()),
                    user_id: Set(idea.author_id.clone()),
                    role: Set(GroupRole::Creator),
                    joined_at: Set(now.into()),
                },
            )
            .await?;

        Ok(group)
    }

    async fn require_member(&self, group_id: &str, principal: &Principal) -> AppResult<()> {
        if self.group_repo.is_member(group_id, &principal.user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(NOT_A_MEMBER.to_string()))
        }
    }

    async fn to_message_responses(
        &self,
        principal: &Principal,
        messages: Vec<group_message::Model>,
    ) -> AppResult<Vec<MessageResponse>> {
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        let read: HashSet<String> = self
            .group_repo
            .find_read_message_ids(&principal.user_id, &ids)
            .await?
            .into_iter()
            .collect();
        let senders =
            load_summaries(&self.user_repo, messages.iter().map(|m| m.sender_id.clone()))
                .await?;

        Ok(messages
            .into_iter()
            .map(|m| MessageResponse {
                is_read: m.sender_id == principal.user_id || read.contains(&m.id),
                sender: senders.get(&m.sender_id).cloned(),
                id: m.id,
                group_id: m.group_id,
                content: m.content,
                created_at: m.created_at,
            })
            .collect())
    }

    async fn to_response(
        &self,
        principal: &Principal,
        group: idea_group::Model,
        with_members: bool,
    ) -> AppResult<GroupResponse> {
        let member_count = self.group_repo.count_members(&group.id).await?;
        let unread_count = self
            .group_repo
            .count_unread(&group.id, &principal.user_id)
            .await?;

        let last_message = match self.group_repo.find_last_message(&group.id).await? {
            Some(m) => self
                .to_message_responses(principal, vec![m])
                .await?
                .into_iter()
                .next(),
            None => None,
        };

        let members = if with_members {
            let members = self.group_repo.find_members(&group.id).await?;
            let users =
                load_summaries(&self.user_repo, members.iter().map(|m| m.user_id.clone()))
                    .await?;
            Some(
                members
                    .into_iter()
                    .map(|m| MemberResponse {
                        user: users.get(&m.user_id).cloned(),
                        id: m.id,
                        role: m.role,
                        joined_at: m.joined_at,
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(GroupResponse {
            id: group.id,
            idea_id: group.idea_id,
            name: group.name,
            description: group.description,
            created_by: group.created_by,
            created_at: group.created_at,
            updated_at: group.updated_at,
            member_count,
            unread_count,
            last_message,
            members,
        })
    }

    /// The caller's groups, most recently updated first.
    pub async fn user_groups(&self, principal: &Principal) -> AppResult<Vec<GroupResponse>> {
        let groups = self.group_repo.find_by_member(&principal.user_id).await?;

        let mut responses = Vec::with_capacity(groups.len());
        for group in groups {
            responses.push(self.to_response(principal, group, false).await?);
        }
        Ok(responses)
    }

    /// A group with its members. Members only.
    pub async fn get_group(&self, principal: &Principal, id: &str) -> AppResult<GroupResponse> {
        let group = self.group_repo.get_by_id(id).await?;
        self.require_member(&group.id, principal).await?;

        self.to_response(principal, group, true).await
    }

    /// The group of an idea with its members. Members only.
    pub async fn get_group_by_idea(
        &self,
        principal: &Principal,
        idea_id: &str,
    ) -> AppResult<GroupResponse> {
        let group = self.group_repo.get_by_idea(idea_id).await?;
        self.require_member(&group.id, principal).await?;

        self.to_response(principal, group, true).await
    }

    /// Join a group.
    pub async fn join(&self, principal: &Principal, id: &str) -> AppResult<GroupResponse> {
        let group = self.group_repo.get_by_id(id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if self
            .group_repo
            .find_member(&txn, &group.id, &principal.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You are already a member of this group".to_string(),
            ));
        }

        self.group_repo
            .add_member(
                &txn,
                group_member::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group.id.clone()),
                    user_id: Set(principal.user_id.clone()),
                    role: Set(GroupRole::Member),
                    joined_at: Set(Utc::now().into()),
                },
            )
            .await?;

        if group.created_by != principal.user_id {
            self.notification_service
                .notify_group_join(&txn, &group.created_by, principal, &group.id, &group.name)
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(group_id = %group.id, user_id = %principal.user_id, "Joined group");
        self.to_response(principal, group, true).await
    }

    /// Join the group of an idea.
    pub async fn join_by_idea(
        &self,
        principal: &Principal,
        idea_id: &str,
    ) -> AppResult<GroupResponse> {
        let group = self.group_repo.get_by_idea(idea_id).await?;
        self.join(principal, &group.id).await
    }

    /// Leave a group. The creator cannot leave.
    pub async fn leave(&self, principal: &Principal, id: &str) -> AppResult<()> {
        let group = self.group_repo.get_by_id(id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let member = self
            .group_repo
            .find_member(&txn, &group.id, &principal.user_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(NOT_A_MEMBER.to_string()))?;

        if member.role.is_creator() {
            return Err(AppError::BadRequest(
                "Group creator cannot leave the group".to_string(),
            ));
        }

        self.group_repo.remove_member(&txn, &member.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(group_id = %group.id, user_id = %principal.user_id, "Left group");
        Ok(())
    }

    /// Messages of a group, oldest first. Members only.
    pub async fn messages(
        &self,
        principal: &Principal,
        id: &str,
    ) -> AppResult<Vec<MessageResponse>> {
        let group = self.group_repo.get_by_id(id).await?;
        self.require_member(&group.id, principal).await?;

        let messages = self.group_repo.find_messages(&group.id).await?;
        self.to_message_responses(principal, messages).await
    }

    /// Post a message and notify the other members.
    pub async fn send_message(
        &self,
        principal: &Principal,
        id: &str,
        input: SendMessageInput,
    ) -> AppResult<MessageResponse> {
        let content = normalize_message(&input.content)?;

        let group = self.group_repo.get_by_id(id).await?;
        self.require_member(&group.id, principal).await?;
        let members = self.group_repo.find_members(&group.id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let now = Utc::now();
        let message = self
            .group_repo
            .create_message(
                &txn,
                group_message::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group.id.clone()),
                    sender_id: Set(principal.user_id.clone()),
                    content: Set(content),
                    created_at: Set(now.into()),
                },
            )
            .await?;

        self.group_repo.touch(&txn, &group.id).await?;
        self.group_repo
            .mark_read(
                &txn,
                group_message_read::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    message_id: Set(message.id.clone()),
                    user_id: Set(principal.user_id.clone()),
                    read_at: Set(now.into()),
                },
            )
            .await?;

        let quoted = preview(&message.content);
        for member in members.iter().filter(|m| m.user_id != principal.user_id) {
            self.notification_service
                .notify_group_message(
                    &txn,
                    &member.user_id,
                    principal,
                    &group.id,
                    &group.name,
                    &quoted,
                )
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let sender = self
            .user_repo
            .find_by_id(&principal.user_id)
            .await?
            .as_ref()
            .map(UserSummary::from);

        Ok(MessageResponse {
            id: message.id,
            group_id: message.group_id,
            sender,
            content: message.content,
            created_at: message.created_at,
            is_read: true,
        })
    }

    /// Mark every message of a group as read by the caller. Returns the number
    /// of receipts written.
    pub async fn mark_all_read(&self, principal: &Principal, id: &str) -> AppResult<u64> {
        let group = self.group_repo.get_by_id(id).await?;
        self.require_member(&group.id, principal).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let unread = self
            .group_repo
            .find_unread_messages(&txn, &group.id, &principal.user_id)
            .await?;

        let now = Utc::now();
        let mut marked = 0;
        for message in unread {
            marked += self
                .group_repo
                .mark_read(
                    &txn,
                    group_message_read::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        message_id: Set(message.id),
                        user_id: Set(principal.user_id.clone()),
                        read_at: Set(now.into()),
                    },
                )
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(marked)
    }

    /// Whether the caller belongs to a group.
    pub async fn membership(&self, principal: &Principal, id: &str) -> AppResult<MembershipStatus> {
        let group = self.group_repo.get_by_id(id).await?;
        Ok(MembershipStatus {
            is_member: self.group_repo.is_member(&group.id, &principal.user_id).await?,
        })
    }

    /// Whether the caller belongs to the group of an idea.
    pub async fn membership_by_idea(
        &self,
        principal: &Principal,
        idea_id: &str,
    ) -> AppResult<MembershipStatus> {
        self.idea_repo.get_by_id(idea_id).await?;
        let group = self.group_repo.get_by_idea(idea_id).await?;
        Ok(MembershipStatus {
            is_member: self.group_repo.is_member(&group.id, &principal.user_id).await?,
        })
    }

    /// Unread messages across all of the caller's groups.
    pub async fn unread_count(&self, principal: &Principal) -> AppResult<u64> {
        self.group_repo.count_unread_total(&principal.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{
        entities::{NotificationType, UserRole},
        repositories::NotificationRepository,
        test_utils::fixtures,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    fn service(db: MockDatabase) -> GroupService {
        build(Arc::new(db.into_connection()))
    }

    fn build(db: Arc<DatabaseConnection>) -> GroupService {
        GroupService::new(
            db.clone(),
            GroupRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            NotificationService::new(db.clone(), NotificationRepository::new(db)),
        )
    }

    fn bob() -> Principal {
        Principal::new("u2", "bob", UserRole::Employee)
    }

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn sql(transaction: &Transaction) -> Vec<String> {
        transaction
            .statements()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_normalize_message() {
        assert_eq!(normalize_message("  hello  ").unwrap(), "hello");
        assert!(matches!(
            normalize_message("   "),
            Err(AppError::BadRequest(_))
        ));
        assert!(normalize_message(&"a".repeat(MAX_MESSAGE_LENGTH)).is_ok());
        assert!(normalize_message(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(80);
        assert_eq!(preview(&long).chars().count(), PREVIEW_LENGTH + 3);
    }

    #[tokio::test]
    async fn test_join_twice_conflicts() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([[fixtures::group_member(
                    "m2",
                    "g1",
                    "u2",
                    GroupRole::Member,
                )]]),
        );

        let result = service.join(&bob(), "g1").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_creator_cannot_leave() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u2")]])
                .append_query_results([[fixtures::group_member(
                    "m1",
                    "g1",
                    "u2",
                    GroupRole::Creator,
                )]]),
        );

        let result = service.leave(&bob(), "g1").await;

        match result {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Group creator cannot leave the group");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_member_cannot_leave() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([Vec::<group_member::Model>::new()]),
        );

        let result = service.leave(&bob(), "g1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_messages_require_membership() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([Vec::<group_member::Model>::new()]),
        );

        let result = service.messages(&bob(), "g1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_for_idea_adds_author_as_creator() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([[fixtures::group_member(
                    "m1",
                    "g1",
                    "u1",
                    GroupRole::Creator,
                )]])
                .into_connection(),
        );
        let idea = fixtures::idea("i1", "u1", "Solar roof");

        let service = build(db.clone());
        let group = service.create_for_idea(db.as_ref(), &idea).await.unwrap();
        drop(service);

        assert_eq!(group.id, "g1");

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 2);

        let group_insert = &sql(&log[0])[0];
        assert!(group_insert.starts_with(r#"INSERT INTO "idea_group""#));
        assert!(group_insert.contains("'Group: Solar roof'"));
        assert!(group_insert.contains("'Discussion group for idea: Solar roof'"));

        let member_insert = &sql(&log[1])[0];
        assert!(member_insert.starts_with(r#"INSERT INTO "group_member""#));
        assert!(member_insert.contains("'g1'"));
        assert!(member_insert.contains("'u1'"));
        assert!(member_insert.contains("'CREATOR'"));
    }

    #[tokio::test]
    async fn test_send_message_marks_own_receipt_and_notifies_others() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([[fixtures::group_member(
                    "m2",
                    "g1",
                    "u2",
                    GroupRole::Member,
                )]])
                .append_query_results([[
                    fixtures::group_member("m1", "g1", "u1", GroupRole::Creator),
                    fixtures::group_member("m2", "g1", "u2", GroupRole::Member),
                    fixtures::group_member("m3", "g1", "u3", GroupRole::Member),
                ]])
                .append_query_results([[fixtures::group_message("msg1", "g1", "u2", "hello")]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "u1",
                    NotificationType::Message,
                )]])
                .append_query_results([[fixtures::notification(
                    "n3",
                    "u3",
                    NotificationType::Message,
                )]])
                .append_query_results([[fixtures::user("u2", "bob")]])
                // touch, own read receipt
                .append_exec_results([affected(1), affected(1)])
                .into_connection(),
        );

        let service = build(db.clone());
        let message = service
            .send_message(
                &bob(),
                "g1",
                SendMessageInput {
                    content: "  hello ".to_string(),
                },
            )
            .await
            .unwrap();
        drop(service);

        assert!(message.is_read);
        assert_eq!(message.content, "hello");
        assert_eq!(
            message.sender.as_ref().map(|s| s.username.as_str()),
            Some("bob")
        );

        // group, membership check, members, the transaction, sender
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 5);
        let statements = sql(&log[3]);

        let receipts: Vec<&String> = statements
            .iter()
            .filter(|s| s.starts_with(r#"INSERT INTO "group_message_read""#))
            .collect();
        assert_eq!(receipts.len(), 1);
        assert!(receipts[0].contains("'msg1'") && receipts[0].contains("'u2'"));

        assert!(statements.iter().any(|s| s.starts_with(r#"UPDATE "idea_group""#)));

        let notifications: Vec<&String> = statements
            .iter()
            .filter(|s| s.starts_with(r#"INSERT INTO "notification""#))
            .collect();
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|s| s.contains("'MESSAGE'")));
        assert!(notifications[0].contains("'u1'"));
        assert!(notifications[1].contains("'u3'"));
    }

    #[tokio::test]
    async fn test_mark_all_read_writes_receipts_for_unread_messages_only() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([[fixtures::group_member(
                    "m2",
                    "g1",
                    "u2",
                    GroupRole::Member,
                )]])
                .append_query_results([[
                    fixtures::group_message("msg1", "g1", "u1", "first"),
                    fixtures::group_message("msg3", "g1", "u3", "third"),
                ]])
                // msg3 was marked read concurrently
                .append_exec_results([affected(1), affected(0)])
                .into_connection(),
        );

        let service = build(db.clone());
        let marked = service.mark_all_read(&bob(), "g1").await.unwrap();
        drop(service);

        assert_eq!(marked, 1);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 3);
        let statements = sql(&log[2]);

        let lookup = statements
            .iter()
            .find(|s| s.starts_with(r#"SELECT"#))
            .unwrap();
        assert!(lookup.contains("<> 'u2'"));
        assert!(lookup.contains("NOT IN (SELECT"));

        let receipts: Vec<&String> = statements
            .iter()
            .filter(|s| s.starts_with(r#"INSERT INTO "group_message_read""#))
            .collect();
        assert_eq!(receipts.len(), 2);
        assert!(receipts[0].contains("'msg1'"));
        assert!(receipts[1].contains("'msg3'"));
        assert!(receipts.iter().all(|s| s.contains("'u2'") && s.contains("DO NOTHING")));
    }
}
