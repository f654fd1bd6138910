//! Create survey, option and vote tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Survey::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Survey::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Survey::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Survey::Question).text().not_null())
                    .col(ColumnDef::new(Survey::Description).text())
                    .col(ColumnDef::new(Survey::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Survey::IsAnonymous).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Survey::AllowMultipleVotes)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Survey::TotalVotes).integer().not_null().default(0))
                    .col(ColumnDef::new(Survey::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Survey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_creator")
                            .from(Survey::Table, Survey::CreatorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SurveyOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SurveyOption::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SurveyOption::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(SurveyOption::OptionText).string_len(255).not_null())
                    .col(ColumnDef::new(SurveyOption::VoteCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(SurveyOption::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_option_survey")
                            .from(SurveyOption::Table, SurveyOption::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_survey_option_survey_id")
                    .table(SurveyOption::Table)
                    .col(SurveyOption::SurveyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SurveyVote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SurveyVote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(SurveyVote::SurveyId).string_len(32).not_null())
                    .col(ColumnDef::new(SurveyVote::OptionId).string_len(32).not_null())
                    .col(ColumnDef::new(SurveyVote::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(SurveyVote::VotedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_vote_survey")
                            .from(SurveyVote::Table, SurveyVote::SurveyId)
                            .to(Survey::Table, Survey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_vote_option")
                            .from(SurveyVote::Table, SurveyVote::OptionId)
                            .to(SurveyOption::Table, SurveyOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_survey_vote_user")
                            .from(SurveyVote::Table, SurveyVote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (option_id, user_id) - one vote per option per user
        manager
            .create_index(
                Index::create()
                    .name("idx_survey_vote_option_user")
                    .table(SurveyVote::Table)
                    .col(SurveyVote::OptionId)
                    .col(SurveyVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_survey_vote_survey_user")
                    .table(SurveyVote::Table)
                    .col(SurveyVote::SurveyId)
                    .col(SurveyVote::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SurveyVote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SurveyOption::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Survey::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Survey {
    Table,
    Id,
    CreatorId,
    Question,
    Description,
    IsActive,
    IsAnonymous,
    AllowMultipleVotes,
    TotalVotes,
    ExpiresAt,
    CreatedAt,
}

#[derive(Iden)]
enum SurveyOption {
    Table,
    Id,
    SurveyId,
    OptionText,
    VoteCount,
    DisplayOrder,
}

#[derive(Iden)]
enum SurveyVote {
    Table,
    Id,
    SurveyId,
    OptionId,
    UserId,
    VotedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
