//! Idea service: CRUD, listing and the status lifecycle.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{AuditAction, IdeaStatus, idea},
    repositories::{
        ChecklistRepository, FileAttachmentRepository, IdeaFilter, IdeaRepository,
        LikeRepository, TagCount, UserRepository,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    Page, Principal,
    services::{
        audit::{AuditEntry, AuditService, entity_type},
        checklist::ChecklistItemResponse,
        file::FileAttachmentResponse,
        gamification::{GamificationService, XpReason},
        group::GroupService,
        notification::NotificationService,
        user::{UserSummary, load_summaries},
    },
};

/// Default page size for idea listings.
pub const DEFAULT_PAGE_SIZE: u64 = 12;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default number of tags returned by the popularity ranking.
pub const DEFAULT_TAG_LIMIT: u64 = 20;

const DEFAULT_SHOWCASE_LIMIT: u64 = 10;

/// Maximum tag length in characters.
const MAX_TAG_LENGTH: usize = 50;

/// Input for submitting an idea.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIdeaInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for editing an idea. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateIdeaInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: IdeaStatus,
}

/// Query parameters for idea listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaQuery {
    pub category: Option<String>,
    pub status: Option<IdeaStatus>,
    pub author_id: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
}

/// An idea as listed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author: Option<UserSummary>,
    pub status: IdeaStatus,
    pub progress_percentage: i32,
    pub like_count: i32,
    pub comment_count: i32,
    pub view_count: i32,
    pub is_featured: bool,
    pub is_liked_by_current_user: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl IdeaResponse {
    fn from_model(m: idea::Model, author: Option<UserSummary>, liked: bool) -> Self {
        Self {
            tags: m.tag_list(),
            id: m.id,
            title: m.title,
            description: m.description,
            category: m.category,
            author,
            status: m.status,
            progress_percentage: m.progress_percentage,
            like_count: m.like_count,
            comment_count: m.comment_count,
            view_count: m.view_count,
            is_featured: m.is_featured,
            is_liked_by_current_user: liked,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// An idea with its checklist and attachments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDetail {
    #[serde(flatten)]
    pub idea: IdeaResponse,
    pub checklist: Vec<ChecklistItemResponse>,
    pub attachments: Vec<FileAttachmentResponse>,
}

/// Trim tags, dropping blanks and duplicates while keeping order.
fn normalize_tags(tags: Vec<String>) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Tags must be at most {MAX_TAG_LENGTH} characters"
            )));
        }
        if seen.insert(tag.to_string()) {
            out.push(tag.to_string());
        }
    }

    Ok(out)
}

/// Progress after entering `status`, or `None` if it stays checklist-driven.
#[must_use]
pub const fn forced_progress(status: IdeaStatus) -> Option<i32> {
    match status {
        IdeaStatus::Concept => Some(0),
        IdeaStatus::Completed => Some(100),
        IdeaStatus::InProgress => None,
    }
}

/// Idea service.
#[derive(Clone)]
pub struct IdeaService {
    db: Arc<DatabaseConnection>,
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    like_repo: LikeRepository,
    checklist_repo: ChecklistRepository,
    file_repo: FileAttachmentRepository,
    group_service: GroupService,
    gamification_service: GamificationService,
    notification_service: NotificationService,
    audit_service: AuditService,
    id_gen: IdGenerator,
}

impl IdeaService {
    /// Create a new idea service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        like_repo: LikeRepository,
        checklist_repo: ChecklistRepository,
        file_repo: FileAttachmentRepository,
        group_service: GroupService,
        gamification_service: GamificationService,
        notification_service: NotificationService,
        audit_service: AuditService,
    ) -> Self {
        Self {
            db,
            idea_repo,
            user_repo,
            like_repo,
            checklist_repo,
            file_repo,
            group_service,
            gamification_service,
            notification_service,
            audit_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Build responses with authors and the caller's like state.
    pub async fn to_responses(
        &self,
        principal: &Principal,
        ideas: Vec<idea::Model>,
    ) -> AppResult<Vec<IdeaResponse>> {
        if ideas.is_empty() {
            return Ok(vec![]);
        }

        let authors =
            load_summaries(&self.user_repo, ideas.iter().map(|i| i.author_id.clone())).await?;
        let liked: HashSet<String> = self
            .like_repo
            .find_liked_idea_ids(&principal.user_id)
            .await?
            .into_iter()
            .collect();

        Ok(ideas
            .into_iter()
            .map(|i| {
                let author = authors.get(&i.author_id).cloned();
                let is_liked = liked.contains(&i.id);
                IdeaResponse::from_model(i, author, is_liked)
            })
            .collect())
    }

    async fn to_response(&self, principal: &Principal, idea: idea::Model) -> AppResult<IdeaResponse> {
        self.to_responses(principal, vec![idea])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Idea"))
    }

    /// Submit a new idea and open its discussion group.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateIdeaInput,
    ) -> AppResult<IdeaResponse> {
        input.validate()?;
        let tags = normalize_tags(input.tags)?;
        let now = Utc::now();

        let model = idea::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            category: Set(input.category.trim().to_string()),
            tags: Set(json!(tags)),
            author_id: Set(principal.user_id.clone()),
            status: Set(IdeaStatus::Concept),
            progress_percentage: Set(0),
            like_count: Set(0),
            comment_count: Set(0),
            view_count: Set(0),
            is_featured: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let idea = self.idea_repo.create(&txn, model).await?;
        self.group_service.create_for_idea(&txn, &idea).await?;
        self.gamification_service
            .award(&txn, &principal.user_id, XpReason::IdeaCreated)
            .await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Create, entity_type::IDEA, &idea.id)
                    .by(&principal.user_id)
                    .new_value(json!({ "title": idea.title, "category": idea.category })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(idea_id = %idea.id, author_id = %idea.author_id, "Idea created");
        self.to_response(principal, idea).await
    }

    /// Fetch an idea with details, counting the view.
    pub async fn get(&self, principal: &Principal, id: &str) -> AppResult<IdeaDetail> {
        let mut idea = self.idea_repo.get_by_id(id).await?;
        self.idea_repo.increment_view_count(&idea.id).await?;
        idea.view_count += 1;

        let checklist = self.checklist_repo.find_by_idea(&idea.id).await?;
        let attachments = self.file_repo.find_by_idea(&idea.id).await?;

        Ok(IdeaDetail {
            idea: self.to_response(principal, idea).await?,
            checklist: checklist.into_iter().map(Into::into).collect(),
            attachments: attachments.into_iter().map(Into::into).collect(),
        })
    }

    /// Edit an idea's core fields. Author or admin only.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        input: UpdateIdeaInput,
    ) -> AppResult<IdeaResponse> {
        input.validate()?;
        let tags = input.tags.map(normalize_tags).transpose()?;

        let idea = self.idea_repo.get_by_id(id).await?;
        if !principal.is_self_or_admin(&idea.author_id) {
            return Err(AppError::Forbidden(
                "You can only edit your own ideas".to_string(),
            ));
        }

        let old_value = json!({
            "title": idea.title,
            "description": idea.description,
            "category": idea.category,
            "tags": idea.tags,
        });

        let mut active: idea::ActiveModel = idea.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category) = input.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(tags) = tags {
            active.tags = Set(json!(tags));
        }
        active.updated_at = Set(Utc::now().into());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = self.idea_repo.update(&txn, active).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Update, entity_type::IDEA, &updated.id)
                    .by(&principal.user_id)
                    .old(old_value)
                    .new_value(json!({
                        "title": updated.title,
                        "description": updated.description,
                        "category": updated.category,
                        "tags": updated.tags,
                    })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.to_response(principal, updated).await
    }

    /// Move an idea to a new status. Project managers and admins only.
    ///
    /// Setting the current status again changes nothing and awards nothing.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: &str,
        status: IdeaStatus,
    ) -> AppResult<IdeaResponse> {
        principal.require_manager()?;

        let idea = self.idea_repo.get_by_id(id).await?;
        let old_status = idea.status;
        if old_status == status {
            return self.to_response(principal, idea).await;
        }

        let author_id = idea.author_id.clone();
        let title = idea.title.clone();

        let mut active: idea::ActiveModel = idea.into();
        active.status = Set(status);
        if let Some(progress) = forced_progress(status) {
            active.progress_percentage = Set(progress);
        }
        active.updated_at = Set(Utc::now().into());

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = self.idea_repo.update(&txn, active).await?;

        if status == IdeaStatus::Completed {
            self.gamification_service
                .award(&txn, &author_id, XpReason::IdeaCompleted)
                .await?;
        }

        self.notification_service
            .notify_status_change(&txn, &author_id, principal, &updated.id, &title, status)
            .await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::StatusChange, entity_type::IDEA, &updated.id)
                    .by(&principal.user_id)
                    .old(json!({ "status": old_status }))
                    .new_value(json!({ "status": status })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(idea_id = %updated.id, from = %old_status, to = %status, "Idea status changed");
        self.to_response(principal, updated).await
    }

    /// Delete an idea and, through cascades, everything attached to it. Admin only.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        principal.require_admin()?;

        let idea = self.idea_repo.get_by_id(id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.idea_repo.delete(&txn, &idea.id).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Delete, entity_type::IDEA, &idea.id)
                    .by(&principal.user_id)
                    .old(json!({ "title": idea.title, "authorId": idea.author_id })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(idea_id = %idea.id, deleted_by = %principal.user_id, "Idea deleted");
        Ok(())
    }

    /// Filtered listing, newest first.
    pub async fn list(
        &self,
        principal: &Principal,
        query: IdeaQuery,
    ) -> AppResult<Page<IdeaResponse>> {
        let page = query.page.unwrap_or(0);
        let size = query
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        if page
            .checked_mul(size)
            .is_none_or(|offset| i64::try_from(offset).is_err())
        {
            return Err(AppError::BadRequest("Page number is too large".to_string()));
        }

        let filter = IdeaFilter {
            category: query.category,
            status: query.status,
            author_id: query.author_id,
            search: query.search,
        };

        let (ideas, total) = self.idea_repo.search(&filter, page, size).await?;
        let content = self.to_responses(principal, ideas).await?;

        Ok(Page::new(content, total, page, size))
    }

    /// Distinct categories.
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.idea_repo.find_categories().await
    }

    /// Most used tags.
    pub async fn popular_tags(&self, limit: Option<u64>) -> AppResult<Vec<TagCount>> {
        let limit = limit.unwrap_or(DEFAULT_TAG_LIMIT).clamp(1, MAX_PAGE_SIZE);
        self.idea_repo.find_popular_tags(limit).await
    }

    /// Ideas with the most likes.
    pub async fn top_by_likes(
        &self,
        principal: &Principal,
        limit: Option<u64>,
    ) -> AppResult<Vec<IdeaResponse>> {
        let limit = limit.unwrap_or(DEFAULT_SHOWCASE_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let ideas = self.idea_repo.find_top_by_likes(limit).await?;
        self.to_responses(principal, ideas).await
    }

    /// Most recently submitted ideas.
    pub async fn newest(
        &self,
        principal: &Principal,
        limit: Option<u64>,
    ) -> AppResult<Vec<IdeaResponse>> {
        let limit = limit.unwrap_or(DEFAULT_SHOWCASE_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let ideas = self.idea_repo.find_newest(limit).await?;
        self.to_responses(principal, ideas).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{
        entities::{
            GroupRole, NotificationType, UserRole, badge, checklist_item, file_attachment, user,
        },
        repositories::{
            AuditLogRepository, BadgeRepository, CommentRepository, GroupRepository,
            NotificationRepository,
        },
        test_utils::fixtures,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};
    use std::collections::BTreeMap;

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn no_likes() -> Vec<BTreeMap<String, Value>> {
        Vec::new()
    }

    fn sql(transaction: &Transaction) -> Vec<String> {
        transaction
            .statements()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn build(db: Arc<DatabaseConnection>) -> IdeaService {
        let notifications =
            NotificationService::new(db.clone(), NotificationRepository::new(db.clone()));
        let gamification = GamificationService::new(
            UserRepository::new(db.clone()),
            BadgeRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            CommentRepository::new(db.clone()),
            notifications.clone(),
        );
        let groups = GroupService::new(
            db.clone(),
            GroupRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            notifications.clone(),
        );
        IdeaService::new(
            db.clone(),
            IdeaRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            LikeRepository::new(db.clone()),
            ChecklistRepository::new(db.clone()),
            FileAttachmentRepository::new(db.clone()),
            groups,
            gamification,
            notifications,
            AuditService::new(AuditLogRepository::new(db)),
        )
    }

    fn service(db: MockDatabase) -> IdeaService {
        build(Arc::new(db.into_connection()))
    }

    #[test]
    fn test_forced_progress() {
        assert_eq!(forced_progress(IdeaStatus::Concept), Some(0));
        assert_eq!(forced_progress(IdeaStatus::InProgress), None);
        assert_eq!(forced_progress(IdeaStatus::Completed), Some(100));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![
            " green ".to_string(),
            String::new(),
            "green".to_string(),
            "office".to_string(),
        ])
        .unwrap();

        assert_eq!(tags, vec!["green".to_string(), "office".to_string()]);
        assert!(normalize_tags(vec!["t".repeat(MAX_TAG_LENGTH + 1)]).is_err());
    }

    #[tokio::test]
    async fn test_status_change_requires_manager() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let employee = Principal::new("u1", "alice", UserRole::Employee);

        let result = service
            .update_status(&employee, "i1", IdeaStatus::Completed)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_same_status_is_silent() {
        let idea = idea::Model {
            status: IdeaStatus::InProgress,
            progress_percentage: 40,
            ..fixtures::idea("i1", "u1", "Solar roof")
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[idea]])
                .append_query_results([[fixtures::user("u1", "alice")]])
                .append_query_results([Vec::<BTreeMap<String, sea_orm::Value>>::new()])
                .into_connection(),
        );
        let pm = Principal::new("p1", "pm", UserRole::ProjectManager);

        let service = build(db.clone());
        let response = service
            .update_status(&pm, "i1", IdeaStatus::InProgress)
            .await
            .unwrap();
        drop(service);

        assert_eq!(response.progress_percentage, 40);

        // idea lookup, author lookup, liked ids; no transaction
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let pm = Principal::new("p1", "pm", UserRole::ProjectManager);

        let result = service.delete(&pm, "i1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_by_other_employee_forbidden() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::idea("i1", "u1", "Solar roof")]]),
        );
        let bob = Principal::new("u2", "bob", UserRole::Employee);

        let result = service
            .update(
                &bob,
                "i1",
                UpdateIdeaInput {
                    title: Some("Mine now".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_long_title() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let alice = Principal::new("u1", "alice", UserRole::Employee);

        let result = service
            .create(
                &alice,
                CreateIdeaInput {
                    title: "t".repeat(201),
                    description: "d".to_string(),
                    category: "Process".to_string(),
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_completing_forces_full_progress_and_awards_xp_once() {
        let before = idea::Model {
            progress_percentage: 40,
            ..fixtures::idea("i1", "u1", "Solar roof")
        };
        let after = idea::Model {
            status: IdeaStatus::Completed,
            progress_percentage: 100,
            ..before.clone()
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[before]])
                .append_query_results([[after]])
                // IDEA_COMPLETED badge is not seeded
                .append_query_results([Vec::<badge::Model>::new()])
                .append_query_results([[user::Model {
                    xp_points: 100,
                    level: 2,
                    ..fixtures::user("u1", "alice")
                }]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "u1",
                    NotificationType::StatusChange,
                )]])
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::StatusChange,
                    entity_type::IDEA,
                    "i1",
                )]])
                .append_query_results([[fixtures::user("u1", "alice")]])
                .append_query_results([no_likes()])
                .append_exec_results([exec_ok()])
                .into_connection(),
        );
        let pm = Principal::new("p1", "pm", UserRole::ProjectManager);

        let service = build(db.clone());
        let response = service
            .update_status(&pm, "i1", IdeaStatus::Completed)
            .await
            .unwrap();
        drop(service);

        assert_eq!(response.status, IdeaStatus::Completed);
        assert_eq!(response.progress_percentage, 100);

        // idea lookup, the transaction, author lookup, liked ids
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 4);

        let statements = sql(&log[1]);
        assert!(statements.iter().any(|s| s.starts_with(r#"UPDATE "idea""#)
            && s.contains(r#""progress_percentage" = 100"#)
            && s.contains("'COMPLETED'")));
        let xp_updates = statements
            .iter()
            .filter(|s| s.starts_with(r#"UPDATE "user""#) && s.contains("xp_points"))
            .collect::<Vec<_>>();
        assert_eq!(xp_updates.len(), 1);
        assert!(xp_updates[0].contains("+ 100"));
        assert!(statements.iter().any(|s| s.starts_with(r#"INSERT INTO "notification""#)
            && s.contains("'STATUS_CHANGE'")
            && s.contains("'u1'")));
        assert!(statements.iter().any(
            |s| s.starts_with(r#"INSERT INTO "audit_log""#) && s.contains("'STATUS_CHANGE'")
        ));
    }

    #[tokio::test]
    async fn test_reopening_resets_progress_without_xp() {
        let before = idea::Model {
            status: IdeaStatus::Completed,
            progress_percentage: 100,
            ..fixtures::idea("i1", "u1", "Solar roof")
        };
        let after = idea::Model {
            status: IdeaStatus::Concept,
            progress_percentage: 0,
            ..before.clone()
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[before]])
                .append_query_results([[after]])
                .append_query_results([[fixtures::notification(
                    "n1",
                    "u1",
                    NotificationType::StatusChange,
                )]])
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::StatusChange,
                    entity_type::IDEA,
                    "i1",
                )]])
                .append_query_results([[fixtures::user("u1", "alice")]])
                .append_query_results([no_likes()])
                .into_connection(),
        );
        let admin = Principal::new("a1", "admin", UserRole::Admin);

        let service = build(db.clone());
        let response = service
            .update_status(&admin, "i1", IdeaStatus::Concept)
            .await
            .unwrap();
        drop(service);

        assert_eq!(response.progress_percentage, 0);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statements = sql(&log[1]);
        // BEGIN, idea update, notification, audit entry, COMMIT
        assert_eq!(statements.len(), 5);
        assert!(statements.iter().any(|s| s.starts_with(r#"UPDATE "idea""#)
            && s.contains(r#""progress_percentage" = 0"#)));
        assert!(!statements.iter().any(|s| s.contains("xp_points")));
    }

    #[tokio::test]
    async fn test_create_fetch_delete_round_trip() {
        let created = fixtures::idea("i1", "u1", "Solar roof");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                // create
                .append_query_results([[created.clone()]])
                .append_query_results([[fixtures::group("g1", "i1", "u1")]])
                .append_query_results([[fixtures::group_member(
                    "m1",
                    "g1",
                    "u1",
                    GroupRole::Creator,
                )]])
                .append_query_results([Vec::<badge::Model>::new()])
                .append_query_results([Vec::<badge::Model>::new()])
                .append_query_results([[user::Model {
                    xp_points: 50,
                    ..fixtures::user("u1", "alice")
                }]])
                .append_query_results([[fixtures::audit_entry(
                    "a1",
                    AuditAction::Create,
                    entity_type::IDEA,
                    "i1",
                )]])
                .append_query_results([[fixtures::user("u1", "alice")]])
                .append_query_results([no_likes()])
                // get
                .append_query_results([[created.clone()]])
                .append_query_results([Vec::<checklist_item::Model>::new()])
                .append_query_results([Vec::<file_attachment::Model>::new()])
                .append_query_results([[fixtures::user("u1", "alice")]])
                .append_query_results([no_likes()])
                // admin delete
                .append_query_results([[created]])
                .append_query_results([[fixtures::audit_entry(
                    "a2",
                    AuditAction::Delete,
                    entity_type::IDEA,
                    "i1",
                )]])
                // get after delete
                .append_query_results([Vec::<idea::Model>::new()])
                // add_xp, view count, delete
                .append_exec_results([exec_ok(), exec_ok(), exec_ok()])
                .into_connection(),
        );
        let service = build(db);
        let alice = Principal::new("u1", "alice", UserRole::Employee);
        let pm = Principal::new("p1", "pm", UserRole::ProjectManager);
        let admin = Principal::new("a1", "admin", UserRole::Admin);

        let response = service
            .create(
                &alice,
                CreateIdeaInput {
                    title: "Solar roof".to_string(),
                    description: "Description of Solar roof".to_string(),
                    category: "Process".to_string(),
                    tags: vec!["green".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(response.status, IdeaStatus::Concept);
        assert_eq!(response.progress_percentage, 0);

        let fetched = service.get(&alice, &response.id).await.unwrap();
        assert_eq!(fetched.idea.id, response.id);
        assert_eq!(fetched.idea.title, response.title);
        assert_eq!(fetched.idea.category, response.category);
        assert_eq!(fetched.idea.tags, response.tags);
        assert_eq!(fetched.idea.view_count, response.view_count + 1);
        assert_eq!(
            fetched.idea.author.as_ref().map(|a| a.username.as_str()),
            Some("alice")
        );

        let result = service.delete(&pm, &response.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        service.delete(&admin, &response.id).await.unwrap();

        let result = service.get(&alice, &response.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_page() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let alice = Principal::new("u1", "alice", UserRole::Employee);

        let service = build(db.clone());
        let result = service
            .list(
                &alice,
                IdeaQuery {
                    page: Some(u64::MAX),
                    ..Default::default()
                },
            )
            .await;
        drop(service);

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(log.is_empty());
    }
}
