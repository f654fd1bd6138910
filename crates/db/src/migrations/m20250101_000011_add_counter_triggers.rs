//! Add triggers maintaining like and vote counters.
//!
//! Counters live next to the unique indexes that guard the inserts, so two
//! concurrent likes or votes can never double count.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // idea.like_count follows idea_like rows
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE OR REPLACE FUNCTION idea_like_count_trigger() RETURNS trigger AS $$
                BEGIN
                    IF TG_OP = 'INSERT' THEN
                        UPDATE idea SET like_count = like_count + 1 WHERE id = NEW.idea_id;
                        RETURN NEW;
                    ELSIF TG_OP = 'DELETE' THEN
                        UPDATE idea SET like_count = GREATEST(like_count - 1, 0) WHERE id = OLD.idea_id;
                        RETURN OLD;
                    END IF;
                    RETURN NULL;
                END;
                $$ LANGUAGE plpgsql;
                ",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r"
                DROP TRIGGER IF EXISTS trg_idea_like_count ON idea_like;
                CREATE TRIGGER trg_idea_like_count
                AFTER INSERT OR DELETE ON idea_like
                FOR EACH ROW EXECUTE FUNCTION idea_like_count_trigger();
                ",
            )
            .await?;

        // survey_option.vote_count and survey.total_votes follow survey_vote rows
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE OR REPLACE FUNCTION survey_vote_count_trigger() RETURNS trigger AS $$
                BEGIN
                    IF TG_OP = 'INSERT' THEN
                        UPDATE survey_option SET vote_count = vote_count + 1 WHERE id = NEW.option_id;
                        UPDATE survey SET total_votes = total_votes + 1 WHERE id = NEW.survey_id;
                        RETURN NEW;
                    ELSIF TG_OP = 'DELETE' THEN
                        UPDATE survey_option SET vote_count = GREATEST(vote_count - 1, 0) WHERE id = OLD.option_id;
                        UPDATE survey SET total_votes = GREATEST(total_votes - 1, 0) WHERE id = OLD.survey_id;
                        RETURN OLD;
                    END IF;
                    RETURN NULL;
                END;
                $$ LANGUAGE plpgsql;
                ",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r"
                DROP TRIGGER IF EXISTS trg_survey_vote_count ON survey_vote;
                CREATE TRIGGER trg_survey_vote_count
                AFTER INSERT OR DELETE ON survey_vote
                FOR EACH ROW EXECUTE FUNCTION survey_vote_count_trigger();
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r"
                DROP TRIGGER IF EXISTS trg_idea_like_count ON idea_like;
                DROP TRIGGER IF EXISTS trg_survey_vote_count ON survey_vote;
                DROP FUNCTION IF EXISTS idea_like_count_trigger();
                DROP FUNCTION IF EXISTS survey_vote_count_trigger();
                ",
            )
            .await?;

        Ok(())
    }
}
