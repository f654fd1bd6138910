//! Survey service.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use ideaboard_common::{AppError, AppResult, IdGenerator};
use ideaboard_db::{
    entities::{AuditAction, survey, survey_option, survey_vote},
    repositories::{SurveyRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    Principal,
    services::{
        audit::{AuditEntry, AuditService, entity_type},
        user::{UserSummary, load_summaries},
    },
};

/// Minimum number of options a survey must offer.
pub const MIN_OPTIONS: usize = 2;

const MAX_OPTION_LENGTH: usize = 200;

/// Input for creating a survey.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurveyInput {
    #[validate(length(min = 1, max = 500))]
    pub question: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub options: Vec<String>,

    #[serde(default)]
    pub is_anonymous: bool,

    #[serde(default)]
    pub allow_multiple_votes: bool,

    pub expires_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInput {
    pub option_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOptionResponse {
    pub id: String,
    pub option_text: String,
    pub vote_count: i32,
    pub display_order: i32,
    pub percentage: f64,
}

/// A survey with results and the caller's voting state. Voters are never listed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub creator: Option<UserSummary>,
    pub is_active: bool,
    pub is_anonymous: bool,
    pub allow_multiple_votes: bool,
    pub total_votes: i32,
    pub expires_at: Option<DateTime<FixedOffset>>,
    pub is_expired: bool,
    pub created_at: DateTime<FixedOffset>,
    pub options: Vec<SurveyOptionResponse>,
    pub has_voted: bool,
    pub user_voted_option_ids: Vec<String>,
}

/// Share of `votes` in `total`, in percent with one decimal.
#[must_use]
pub fn percentage(votes: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (f64::from(votes) * 1000.0 / f64::from(total)).round() / 10.0
}

fn is_expired(survey: &survey::Model, now: DateTime<Utc>) -> bool {
    survey.expires_at.is_some_and(|at| at <= now)
}

/// Trim option texts and drop blanks.
fn normalize_options(options: Vec<String>) -> AppResult<Vec<String>> {
    let options: Vec<String> = options
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if options.len() < MIN_OPTIONS {
        return Err(AppError::BadRequest(format!(
            "A survey needs at least {MIN_OPTIONS} options"
        )));
    }
    if options.iter().any(|o| o.chars().count() > MAX_OPTION_LENGTH) {
        return Err(AppError::BadRequest(format!(
            "Options must be at most {MAX_OPTION_LENGTH} characters"
        )));
    }
    Ok(options)
}

fn build_response(
    survey: survey::Model,
    options: Vec<survey_option::Model>,
    votes: &[survey_vote::Model],
    creator: Option<UserSummary>,
) -> SurveyResponse {
    let total = survey.total_votes;
    let voted: Vec<String> = votes.iter().map(|v| v.option_id.clone()).collect();

    SurveyResponse {
        is_expired: is_expired(&survey, Utc::now()),
        id: survey.id,
        question: survey.question,
        description: survey.description,
        creator,
        is_active: survey.is_active,
        is_anonymous: survey.is_anonymous,
        allow_multiple_votes: survey.allow_multiple_votes,
        total_votes: total,
        expires_at: survey.expires_at,
        created_at: survey.created_at,
        options: options
            .into_iter()
            .map(|o| SurveyOptionResponse {
                percentage: percentage(o.vote_count, total),
                id: o.id,
                option_text: o.option_text,
                vote_count: o.vote_count,
                display_order: o.display_order,
            })
            .collect(),
        has_voted: !voted.is_empty(),
        user_voted_option_ids: voted,
    }
}

/// Survey service.
#[derive(Clone)]
pub struct SurveyService {
    db: Arc<DatabaseConnection>,
    survey_repo: SurveyRepository,
    user_repo: UserRepository,
    audit_service: AuditService,
    id_gen: IdGenerator,
}

impl SurveyService {
    /// Create a new survey service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        survey_repo: SurveyRepository,
        user_repo: UserRepository,
        audit_service: AuditService,
    ) -> Self {
        Self {
            db,
            survey_repo,
            user_repo,
            audit_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Build responses for several surveys with batched lookups.
    pub async fn to_responses(
        &self,
        principal: &Principal,
        surveys: Vec<survey::Model>,
    ) -> AppResult<Vec<SurveyResponse>> {
        let ids: Vec<String> = surveys.iter().map(|s| s.id.clone()).collect();
        let options = self.survey_repo.find_options_for(&ids).await?;
        let votes = self
            .survey_repo
            .find_votes_by_user_for(&ids, &principal.user_id)
            .await?;
        let creators =
            load_summaries(&self.user_repo, surveys.iter().map(|s| s.creator_id.clone()))
                .await?;

        Ok(surveys
            .into_iter()
            .map(|s| {
                let own_options = options
                    .iter()
                    .filter(|o| o.survey_id == s.id)
                    .cloned()
                    .collect();
                let own_votes: Vec<survey_vote::Model> = votes
                    .iter()
                    .filter(|v| v.survey_id == s.id)
                    .cloned()
                    .collect();
                let creator = creators.get(&s.creator_id).cloned();
                build_response(s, own_options, &own_votes, creator)
            })
            .collect())
    }

    /// Every survey, newest first.
    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<SurveyResponse>> {
        let surveys = self.survey_repo.find_all().await?;
        self.to_responses(principal, surveys).await
    }

    /// Open surveys, newest first.
    pub async fn active(&self, principal: &Principal) -> AppResult<Vec<SurveyResponse>> {
        let now = Utc::now();
        let surveys = self
            .survey_repo
            .find_active()
            .await?
            .into_iter()
            .filter(|s| !is_expired(s, now))
            .collect();
        self.to_responses(principal, surveys).await
    }

    /// A survey with results.
    pub async fn get(&self, principal: &Principal, id: &str) -> AppResult<SurveyResponse> {
        let survey = self.survey_repo.get_by_id(id).await?;
        self.to_responses(principal, vec![survey])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Survey"))
    }

    /// Create a survey with its options in the given order.
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateSurveyInput,
    ) -> AppResult<SurveyResponse> {
        input.validate()?;
        let option_texts = normalize_options(input.options)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let survey = self
            .survey_repo
            .create(
                &txn,
                survey::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    creator_id: Set(principal.user_id.clone()),
                    question: Set(input.question.trim().to_string()),
                    description: Set(input.description),
                    is_active: Set(true),
                    is_anonymous: Set(input.is_anonymous),
                    allow_multiple_votes: Set(input.allow_multiple_votes),
                    total_votes: Set(0),
                    expires_at: Set(input.expires_at),
                    created_at: Set(Utc::now().into()),
                },
            )
            .await?;

        for (order, text) in (0_i32..).zip(option_texts) {
            self.survey_repo
                .create_option(
                    &txn,
                    survey_option::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        survey_id: Set(survey.id.clone()),
                        option_text: Set(text),
                        vote_count: Set(0),
                        display_order: Set(order),
                    },
                )
                .await?;
        }

        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Create, entity_type::SURVEY, &survey.id)
                    .by(&principal.user_id)
                    .new_value(json!({ "question": survey.question })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(survey_id = %survey.id, creator_id = %principal.user_id, "Survey created");
        self.get(principal, &survey.id).await
    }

    /// Vote for one or more options.
    pub async fn vote(
        &self,
        principal: &Principal,
        id: &str,
        input: VoteInput,
    ) -> AppResult<SurveyResponse> {
        let mut requested: Vec<String> = Vec::with_capacity(input.option_ids.len());
        for option_id in input.option_ids {
            if !requested.contains(&option_id) {
                requested.push(option_id);
            }
        }
        if requested.is_empty() {
            return Err(AppError::BadRequest(
                "Select at least one option".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let survey = self.survey_repo.get_by_id_on(&txn, id).await?;
        if !survey.is_active || is_expired(&survey, Utc::now()) {
            return Err(AppError::BadRequest("Survey is closed".to_string()));
        }

        let prior = self
            .survey_repo
            .find_votes_by_user(&txn, &survey.id, &principal.user_id)
            .await?;

        if !survey.allow_multiple_votes {
            if !prior.is_empty() {
                return Err(AppError::Conflict(
                    "You have already voted in this survey".to_string(),
                ));
            }
            if requested.len() > 1 {
                return Err(AppError::BadRequest(
                    "This survey allows only one vote".to_string(),
                ));
            }
        }

        let options = self.survey_repo.find_options(&txn, &survey.id).await?;
        let valid: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
        if let Some(bad) = requested.iter().find(|o| !valid.contains(o.as_str())) {
            return Err(AppError::BadRequest(format!(
                "Option {bad} does not belong to this survey"
            )));
        }

        let already: HashSet<&str> = prior.iter().map(|v| v.option_id.as_str()).collect();
        let now = Utc::now();
        for option_id in requested.iter().filter(|o| !already.contains(o.as_str())) {
            self.survey_repo
                .create_vote(
                    &txn,
                    survey_vote::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        survey_id: Set(survey.id.clone()),
                        option_id: Set(option_id.clone()),
                        user_id: Set(principal.user_id.clone()),
                        voted_at: Set(now.into()),
                    },
                )
                .await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.get(principal, &survey.id).await
    }

    /// Delete a survey. Creator or admin only.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        let survey = self.survey_repo.get_by_id(id).await?;
        if !principal.is_self_or_admin(&survey.creator_id) {
            return Err(AppError::Forbidden(
                "Only the survey creator or an admin can delete this survey".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.survey_repo.delete(&txn, &survey.id).await?;
        self.audit_service
            .record(
                &txn,
                AuditEntry::new(AuditAction::Delete, entity_type::SURVEY, &survey.id)
                    .by(&principal.user_id)
                    .old(json!({ "question": survey.question })),
            )
            .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(survey_id = %survey.id, "Survey deleted");
        Ok(())
    }
}
