//! Create badge catalogue and award tables, seeded with the built-in badges.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Badge::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Badge::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Badge::Name).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Badge::DisplayName).string_len(100).not_null())
                    .col(ColumnDef::new(Badge::Description).text().not_null())
                    .col(ColumnDef::new(Badge::Icon).string_len(50).not_null())
                    .col(ColumnDef::new(Badge::Criteria).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(Badge::XpReward).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserBadge::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserBadge::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(UserBadge::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UserBadge::BadgeId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserBadge::EarnedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_badge_user")
                            .from(UserBadge::Table, UserBadge::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_badge_badge")
                            .from(UserBadge::Table, UserBadge::BadgeId)
                            .to(Badge::Table, Badge::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, badge_id) - each badge is earned once
        manager
            .create_index(
                Index::create()
                    .name("idx_user_badge_user_badge")
                    .table(UserBadge::Table)
                    .col(UserBadge::UserId)
                    .col(UserBadge::BadgeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r"
                INSERT INTO badge (id, name, display_name, description, icon, criteria, xp_reward) VALUES
                    ('badge_first_idea', 'first_idea', 'First Idea', 'Submitted your first idea', 'lightbulb', 'FIRST_IDEA', 10),
                    ('badge_ideas_5', 'idea_machine', 'Idea Machine', 'Submitted five ideas', 'rocket', 'IDEAS_5', 25),
                    ('badge_likes_10', 'crowd_favorite', 'Crowd Favorite', 'Received ten likes', 'heart', 'LIKES_RECEIVED_10', 25),
                    ('badge_comments_10', 'conversationalist', 'Conversationalist', 'Wrote ten comments', 'message-circle', 'COMMENTS_10', 15),
                    ('badge_completed', 'finisher', 'Finisher', 'Had an idea reach completion', 'check-circle', 'IDEA_COMPLETED', 50)
                ON CONFLICT (criteria) DO NOTHING;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserBadge::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Badge::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Badge {
    Table,
    Id,
    Name,
    DisplayName,
    Description,
    Icon,
    Criteria,
    XpReward,
}

#[derive(Iden)]
enum UserBadge {
    Table,
    Id,
    UserId,
    BadgeId,
    EarnedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
