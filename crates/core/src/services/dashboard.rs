//! Dashboard aggregates.

use std::collections::HashMap;

use chrono::{Days, Local, NaiveDate, TimeZone, Utc};
use ideaboard_common::AppResult;
use ideaboard_db::{
    entities::IdeaStatus,
    repositories::{
        CategoryCount, CommentRepository, DailyCount, IdeaRepository, LikeRepository,
        SurveyRepository, UserRepository,
    },
};
use serde::Serialize;

use crate::{
    Principal,
    services::{
        idea::{IdeaResponse, IdeaService},
        like::current_window_start,
        survey::{SurveyResponse, SurveyService},
    },
};

const TOP_IDEAS_LIMIT: u64 = 3;
const NEW_IDEAS_LIMIT: u64 = 5;
const ACTIVITY_DAYS: u64 = 7;

/// Ideas created on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub ideas: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatistics {
    pub total_ideas: u64,
    pub total_users: u64,
    pub ideas_this_week: u64,
    pub concept_ideas: i64,
    pub in_progress_ideas: i64,
    pub completed_ideas: i64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub active_surveys: u64,
    pub popular_category: String,
    pub category_breakdown: Vec<CategoryCount>,
    pub weekly_activity: Vec<DailyActivity>,
}

/// An idea ranked by likes received in the current window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopIdea {
    pub rank: usize,
    pub idea: IdeaResponse,
    pub weekly_likes: i64,
}

/// One entry per day from `first` through `last`, zero where no ideas were created.
#[must_use]
pub fn fill_activity(counts: &[DailyCount], first: NaiveDate, last: NaiveDate) -> Vec<DailyActivity> {
    let by_day: HashMap<NaiveDate, i64> = counts.iter().map(|c| (c.day, c.count)).collect();

    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|date| DailyActivity {
            date,
            ideas: by_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Dashboard service.
#[derive(Clone)]
pub struct DashboardService {
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    survey_repo: SurveyRepository,
    idea_service: IdeaService,
    survey_service: SurveyService,
}

impl DashboardService {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
        survey_repo: SurveyRepository,
        idea_service: IdeaService,
        survey_service: SurveyService,
    ) -> Self {
        Self {
            idea_repo,
            user_repo,
            like_repo,
            comment_repo,
            survey_repo,
            idea_service,
            survey_service,
        }
    }

    /// Board-wide statistics.
    pub async fn statistics(&self) -> AppResult<DashboardStatistics> {
        let status_counts = self.idea_repo.count_by_status().await?;
        let count_for = |status: IdeaStatus| {
            status_counts
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, c)| *c)
        };

        let category_breakdown = self.idea_repo.count_by_category().await?;
        let popular_category = category_breakdown
            .first()
            .map_or_else(|| "N/A".to_string(), |c| c.category.clone());

        let today = Local::now().date_naive();
        let first_day = today
            .checked_sub_days(Days::new(ACTIVITY_DAYS - 1))
            .unwrap_or(today);
        let since = first_day
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .map_or_else(Utc::now, |start| start.with_timezone(&Utc));
        let daily = self.idea_repo.count_daily_since(since).await?;

        Ok(DashboardStatistics {
            total_ideas: self.idea_repo.count_all().await?,
            total_users: self.user_repo.count_active().await?,
            ideas_this_week: self
                .idea_repo
                .count_created_since(current_window_start())
                .await?,
            concept_ideas: count_for(IdeaStatus::Concept),
            in_progress_ideas: count_for(IdeaStatus::InProgress),
            completed_ideas: count_for(IdeaStatus::Completed),
            total_likes: self.like_repo.count_all().await?,
            total_comments: self.comment_repo.count_all().await?,
            active_surveys: self.survey_repo.count_active().await?,
            popular_category,
            category_breakdown,
            weekly_activity: fill_activity(&daily, first_day, today),
        })
    }

    /// The most liked ideas of the current quota window.
    pub async fn top_ideas(&self, principal: &Principal) -> AppResult<Vec<TopIdea>> {
        let counts = self
            .like_repo
            .top_ideas_since(current_window_start(), TOP_IDEAS_LIMIT)
            .await?;
        if counts.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = counts.iter().map(|c| c.idea_id.clone()).collect();
        let ideas = self.idea_repo.find_by_ids(&ids).await?;
        let mut responses: HashMap<String, IdeaResponse> = self
            .idea_service
            .to_responses(principal, ideas)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(counts
            .into_iter()
            .filter_map(|c| responses.remove(&c.idea_id).map(|idea| (idea, c.likes)))
            .enumerate()
            .map(|(i, (idea, weekly_likes))| TopIdea {
                rank: i + 1,
                idea,
                weekly_likes,
            })
            .collect())
    }

    /// Latest submissions.
    pub async fn new_ideas(
        &self,
        principal: &Principal,
        limit: Option<u64>,
    ) -> AppResult<Vec<IdeaResponse>> {
        self.idea_service
            .newest(principal, Some(limit.unwrap_or(NEW_IDEAS_LIMIT)))
            .await
    }

    /// Surveys open for voting.
    pub async fn surveys(&self, principal: &Principal) -> AppResult<Vec<SurveyResponse>> {
        self.survey_service.active(principal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_fill_activity_zero_fills_missing_days() {
        let counts = vec![
            DailyCount {
                day: day(10),
                count: 2,
            },
            DailyCount {
                day: day(12),
                count: 1,
            },
        ];

        let activity = fill_activity(&counts, day(6), day(12));

        assert_eq!(activity.len(), 7);
        assert_eq!(activity[0].date, day(6));
        assert_eq!(activity[4].ideas, 2);
        assert_eq!(activity[5].ideas, 0);
        assert_eq!(activity[6].ideas, 1);
    }

    #[test]
    fn test_fill_activity_ignores_days_outside_range() {
        let counts = vec![DailyCount {
            day: day(1),
            count: 9,
        }];

        let activity = fill_activity(&counts, day(6), day(7));

        assert_eq!(
            activity,
            vec![
                DailyActivity {
                    date: day(6),
                    ideas: 0
                },
                DailyActivity {
                    date: day(7),
                    ideas: 0
                },
            ]
        );
    }
}
