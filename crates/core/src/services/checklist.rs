//! Checklist service. Every mutation recalculates the idea's progress.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{checklist_item, idea},
    repositories::{ChecklistRepository, IdeaRepository},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Principal;

/// Maximum item title length in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Progress for a checklist, or `None` when it has no items.
#[must_use]
pub fn progress_percentage(completed: u64, total: u64) -> Option<i32> {
    if total == 0 {
        return None;
    }
    let completed = completed.min(total);
    // round half up
    let pct = (200 * completed + total) / (2 * total);
    i32::try_from(pct).ok()
}

fn normalize_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title.to_string())
}

#[derive(Debug, Deserialize)]
pub struct CreateChecklistItemInput {
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChecklistItemInput {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

/// A checklist item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemResponse {
    pub id: String,
    pub idea_id: String,
    pub title: String,
    pub is_completed: bool,
    pub ordinal_position: i32,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<checklist_item::Model> for ChecklistItemResponse {
    fn from(m: checklist_item::Model) -> Self {
        Self {
            id: m.id,
            idea_id: m.idea_id,
            title: m.title,
            is_completed: m.is_completed,
            ordinal_position: m.ordinal_position,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Checklist service.
#[derive(Clone)]
pub struct ChecklistService {
    db: Arc<DatabaseConnection>,
    checklist_repo: ChecklistRepository,
    idea_repo: IdeaRepository,
    id_gen: IdGenerator,
}

impl ChecklistService {
    /// Create a new checklist service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        checklist_repo: ChecklistRepository,
        idea_repo: IdeaRepository,
    ) -> Self {
        Self {
            db,
            checklist_repo,
            idea_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Items of an idea in display order.
    pub async fn list(&self, idea_id: &str) -> AppResult<Vec<ChecklistItemResponse>> {
        self.idea_repo.get_by_id(idea_id).await?;
        let items = self.checklist_repo.find_by_idea(idea_id).await?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    async fn require_author(&self, principal: &Principal, idea_id: &str) -> AppResult<idea::Model> {
        let idea = self.idea_repo.get_by_id(idea_id).await?;
        if idea.author_id != principal.user_id {
            return Err(AppError::Forbidden(
                "Only the idea author can modify the checklist".to_string(),
            ));
        }
        Ok(idea)
    }

    async fn get_item(&self, idea_id: &str, item_id: &str) -> AppResult<checklist_item::Model> {
        let item = self.checklist_repo.get_by_id(item_id).await?;
        if item.idea_id != idea_id {
            return Err(AppError::BadRequest(
                "Checklist item does not belong to this idea".to_string(),
            ));
        }
        Ok(item)
    }

    async fn recalculate_progress<C: ConnectionTrait>(
        &self,
        conn: &C,
        idea_id: &str,
    ) -> AppResult<()> {
        let (completed, total) = self.checklist_repo.completion_counts(conn, idea_id).await?;

        if let Some(progress) = progress_percentage(completed, total) {
            self.idea_repo.set_progress(conn, idea_id, progress).await?;
            debug!(idea_id = %idea_id, progress = progress, "Idea progress recalculated");
        }
        Ok(())
    }

    /// Append an item.
    pub async fn create(
        &self,
        principal: &Principal,
        idea_id: &str,
        input: CreateChecklistItemInput,
    ) -> AppResult<ChecklistItemResponse> {
        let title = normalize_title(&input.title)?;
        self.require_author(principal, idea_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let ordinal = self
            .checklist_repo
            .max_ordinal(&txn, idea_id)
            .await?
            .map_or(0, |max| max + 1);

        let now = Utc::now();
        let item = self
            .checklist_repo
            .create(
                &txn,
                checklist_item::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    idea_id: Set(idea_id.to_string()),
                    title: Set(title),
                    is_completed: Set(false),
                    ordinal_position: Set(ordinal),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                },
            )
            .await?;

        self.recalculate_progress(&txn, idea_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(item.into())
    }

    /// Flip an item's completion state.
    pub async fn toggle(
        &self,
        principal: &Principal,
        idea_id: &str,
        item_id: &str,
    ) -> AppResult<ChecklistItemResponse> {
        self.require_author(principal, idea_id).await?;
        let item = self.get_item(idea_id, item_id).await?;

        let completed = !item.is_completed;
        let mut active: checklist_item::ActiveModel = item.into();
        active.is_completed = Set(completed);
        active.updated_at = Set(Utc::now().into());

        self.save(idea_id, active).await
    }

    /// Change an item's title or completion state.
    pub async fn update(
        &self,
        principal: &Principal,
        idea_id: &str,
        item_id: &str,
        input: UpdateChecklistItemInput,
    ) -> AppResult<ChecklistItemResponse> {
        let title = input.title.as_deref().map(normalize_title).transpose()?;
        self.require_author(principal, idea_id).await?;
        let item = self.get_item(idea_id, item_id).await?;

        let mut active: checklist_item::ActiveModel = item.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(completed) = input.is_completed {
            active.is_completed = Set(completed);
        }
        active.updated_at = Set(Utc::now().into());

        self.save(idea_id, active).await
    }

    async fn save(
        &self,
        idea_id: &str,
        active: checklist_item::ActiveModel,
    ) -> AppResult<ChecklistItemResponse> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let item = self.checklist_repo.update(&txn, active).await?;
        self.recalculate_progress(&txn, idea_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(item.into())
    }

    /// Remove an item.
    pub async fn delete(&self, principal: &Principal, idea_id: &str, item_id: &str) -> AppResult<()> {
        self.require_author(principal, idea_id).await?;
        let item = self.get_item(idea_id, item_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.checklist_repo.delete(&txn, &item.id).await?;
        self.recalculate_progress(&txn, idea_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{entities::UserRole, test_utils::fixtures};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;

    fn service(db: Arc<DatabaseConnection>) -> ChecklistService {
        ChecklistService::new(
            db.clone(),
            ChecklistRepository::new(db.clone()),
            IdeaRepository::new(db),
        )
    }

    fn alice() -> Principal {
        Principal::new("u1", "alice", UserRole::Employee)
    }

    fn count(n: i64) -> BTreeMap<String, sea_orm::Value> {
        BTreeMap::from([("num_items".to_string(), sea_orm::Value::BigInt(Some(n)))])
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(progress_percentage(0, 0), None);
        assert_eq!(progress_percentage(0, 4), Some(0));
        assert_eq!(progress_percentage(1, 3), Some(33));
        assert_eq!(progress_percentage(2, 3), Some(67));
        assert_eq!(progress_percentage(1, 2), Some(50));
        assert_eq!(progress_percentage(1, 8), Some(13));
        assert_eq!(progress_percentage(3, 3), Some(100));
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Draft plan ").unwrap(), "Draft plan");
        assert!(normalize_title("").is_err());
        assert!(normalize_title(&"t".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn test_non_author_cannot_modify() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::idea("i1", "someone-else", "Idea")]])
                .into_connection(),
        );

        let result = service(db)
            .create(
                &alice(),
                "i1",
                CreateChecklistItemInput {
                    title: "Step".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_item_from_other_idea_rejected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::idea("i1", "u1", "Idea")]])
                .append_query_results([[fixtures::checklist_item("c1", "i2", 0, false)]])
                .into_connection(),
        );

        let result = service(db).toggle(&alice(), "i1", "c1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_toggle_recalculates_progress() {
        let toggled = fixtures::checklist_item("c1", "i1", 0, true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::idea("i1", "u1", "Idea")]])
                .append_query_results([[fixtures::checklist_item("c1", "i1", 0, false)]])
                .append_query_results([[toggled]])
                .append_query_results([[count(2)]])
                .append_query_results([[count(1)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = service(db.clone());
        let item = service.toggle(&alice(), "i1", "c1").await.unwrap();
        drop(service);

        assert!(item.is_completed);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let update_sql = format!("{:?}", log.last().unwrap());
        assert!(update_sql.contains("progress_percentage"));
        assert!(update_sql.contains("50"));
    }
}
