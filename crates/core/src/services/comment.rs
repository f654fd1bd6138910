//! Comment and comment reaction service.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{comment, comment_reaction},
    repositories::{CommentRepository, IdeaRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Principal,
    services::{
        gamification::{GamificationService, XpReason},
        notification::NotificationService,
        user::{UserSummary, load_summaries},
    },
};

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 200;

/// Maximum emoji length in characters.
const MAX_EMOJI_LENGTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionInput {
    pub emoji: String,
}

/// A comment with its reactions grouped by emoji.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub idea_id: String,
    pub author: Option<UserSummary>,
    pub content: String,
    pub reaction_count: i32,
    /// Emoji to number of users who reacted with it.
    pub reactions: BTreeMap<String, u64>,
    /// Emojis the caller reacted with.
    pub user_reactions: Vec<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

fn normalize_content(content: &str) -> AppResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment content is required".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(content.to_string())
}

fn normalize_emoji(emoji: &str) -> AppResult<String> {
    let emoji = emoji.trim();
    if emoji.is_empty() || emoji.chars().count() > MAX_EMOJI_LENGTH {
        return Err(AppError::BadRequest("Invalid emoji".to_string()));
    }
    Ok(emoji.to_string())
}

/// Group reactions by emoji and collect the caller's own emojis.
fn summarize_reactions<'a>(
    reactions: impl Iterator<Item = &'a comment_reaction::Model>,
    user_id: &str,
) -> (BTreeMap<String, u64>, Vec<String>) {
    let mut counts = BTreeMap::new();
    let mut mine = Vec::new();

    for r in reactions {
        *counts.entry(r.emoji.clone()).or_insert(0) += 1;
        if r.user_id == user_id {
            mine.push(r.emoji.clone());
        }
    }

    (counts, mine)
}

/// Comment service.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<DatabaseConnection>,
    comment_repo: CommentRepository,
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    gamification_service: GamificationService,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        comment_repo: CommentRepository,
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        gamification_service: GamificationService,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            db,
            comment_repo,
            idea_repo,
            user_repo,
            gamification_service,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    async fn to_responses(
        &self,
        principal: &Principal,
        comments: Vec<comment::Model>,
    ) -> AppResult<Vec<CommentResponse>> {
        let ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let reactions = self.comment_repo.find_reactions(&ids).await?;
        let authors =
            load_summaries(&self.user_repo, comments.iter().map(|c| c.author_id.clone()))
                .await?;

        Ok(comments
            .into_iter()
            .map(|c| {
                let (reactions, user_reactions) = summarize_reactions(
                    reactions.iter().filter(|r| r.comment_id == c.id),
                    &principal.user_id,
                );
                CommentResponse {
                    author: authors.get(&c.author_id).cloned(),
                    id: c.id,
                    idea_id: c.idea_id,
                    content: c.content,
                    reaction_count: c.reaction_count,
                    reactions,
                    user_reactions,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                }
            })
            .collect())
    }

    async fn get_one(&self, principal: &Principal, id: &str) -> AppResult<CommentResponse> {
        let comment = self.comment_repo.get_by_id(id).await?;
        self.to_responses(principal, vec![comment])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Comment"))
    }

    /// Comments of an idea, oldest first.
    pub async fn list(&self, principal: &Principal, idea_id: &str) -> AppResult<Vec<CommentResponse>> {
        self.idea_repo.get_by_id(idea_id).await?;
        let comments = self.comment_repo.find_by_idea(idea_id).await?;
        self.to_responses(principal, comments).await
    }

    /// Post a comment.
    pub async fn create(
        &self,
        principal: &Principal,
        idea_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentResponse> {
        let content = normalize_content(&input.content)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let idea = self.idea_repo.get_by_id_on(&txn, idea_id).await?;

        let now = Utc::now();
        let comment = self
            .comment_repo
            .create(
                &txn,
                comment::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    idea_id: Set(idea.id.clone()),
                    author_id: Set(principal.user_id.clone()),
                    content: Set(content),
                    reaction_count: Set(0),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                },
            )
            .await?;

        self.idea_repo.increment_comment_count(&txn, &idea.id).await?;
        self.gamification_service
            .award(&txn, &principal.user_id, XpReason::CommentPosted)
            .await?;

        if idea.author_id != principal.user_id {
            self.notification_service
                .notify_comment(&txn, &idea.author_id, principal, &idea.id, &idea.title)
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(comment_id = %comment.id, idea_id = %idea.id, "Comment posted");
        self.get_one(principal, &comment.id).await
    }

    /// Delete a comment. Author or admin only.
    pub async fn delete(&self, principal: &Principal, idea_id: &str, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.idea_id != idea_id {
            return Err(AppError::not_found("Comment"));
        }
        if !principal.is_self_or_admin(&comment.author_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.comment_repo.delete(&txn, &comment.id).await?;
        self.idea_repo
            .decrement_comment_count(&txn, &comment.idea_id)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// React to a comment with an emoji.
    pub async fn add_reaction(
        &self,
        principal: &Principal,
        comment_id: &str,
        input: ReactionInput,
    ) -> AppResult<CommentResponse> {
        let emoji = normalize_emoji(&input.emoji)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if self
            .comment_repo
            .find_reaction(&txn, &comment.id, &principal.user_id, &emoji)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already reacted with this emoji".to_string(),
            ));
        }

        self.comment_repo
            .create_reaction(
                &txn,
                comment_reaction::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    comment_id: Set(comment.id.clone()),
                    user_id: Set(principal.user_id.clone()),
                    emoji: Set(emoji.clone()),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await?;
        self.comment_repo
            .increment_reaction_count(&txn, &comment.id)
            .await?;

        if comment.author_id != principal.user_id {
            self.notification_service
                .notify_reaction(
                    &txn,
                    &comment.author_id,
                    principal,
                    &comment.idea_id,
                    &comment.id,
                    &emoji,
                )
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_one(principal, &comment.id).await
    }

    /// Remove the caller's reaction with an emoji.
    pub async fn remove_reaction(
        &self,
        principal: &Principal,
        comment_id: &str,
        emoji: &str,
    ) -> AppResult<CommentResponse> {
        let emoji = normalize_emoji(emoji)?;
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let reaction = self
            .comment_repo
            .find_reaction(&txn, &comment.id, &principal.user_id, &emoji)
            .await?
            .ok_or_else(|| AppError::not_found("Reaction"))?;

        self.comment_repo.delete_reaction(&txn, &reaction.id).await?;
        self.comment_repo
            .decrement_reaction_count(&txn, &comment.id)
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get_one(principal, &comment.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_db::{
        entities::UserRole,
        repositories::{BadgeRepository, LikeRepository, NotificationRepository},
        test_utils::fixtures,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: MockDatabase) -> CommentService {
        let db = Arc::new(db.into_connection());
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
        CommentService::new(
            db.clone(),
            CommentRepository::new(db.clone()),
            IdeaRepository::new(db.clone()),
            UserRepository::new(db),
            gamification,
            notifications,
        )
    }

    #[test]
    fn test_summarize_reactions() {
        let reactions = [
            fixtures::reaction("r1", "c1", "u1", "👍"),
            fixtures::reaction("r2", "c1", "u2", "👍"),
            fixtures::reaction("r3", "c1", "u2", "🎉"),
        ];

        let (counts, mine) = summarize_reactions(reactions.iter(), "u2");

        assert_eq!(counts.get("👍"), Some(&2));
        assert_eq!(counts.get("🎉"), Some(&1));
        assert_eq!(mine, vec!["👍".to_string(), "🎉".to_string()]);
    }

    #[test]
    fn test_content_limits() {
        assert!(normalize_content("").is_err());
        assert!(normalize_content(&"c".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(matches!(
            normalize_content(&"c".repeat(MAX_COMMENT_LENGTH + 1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_by_other_user_forbidden() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "i1", "u1", "Nice")]]),
        );
        let carol = Principal::new("u3", "carol", UserRole::ProjectManager);

        let result = service.delete(&carol, "i1", "c1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_duplicate_reaction_conflicts() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "i1", "u1", "Nice")]])
                .append_query_results([[fixtures::reaction("r1", "c1", "u2", "👍")]]),
        );
        let bob = Principal::new("u2", "bob", UserRole::Employee);

        let result = service
            .add_reaction(
                &bob,
                "c1",
                ReactionInput {
                    emoji: "👍".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remove_missing_reaction() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[fixtures::comment("c1", "i1", "u1", "Nice")]])
                .append_query_results([Vec::<comment_reaction::Model>::new()]),
        );
        let bob = Principal::new("u2", "bob", UserRole::Employee);

        let result = service.remove_reaction(&bob, "c1", "👍").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
