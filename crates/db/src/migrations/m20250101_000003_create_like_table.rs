//! Create idea like table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IdeaLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IdeaLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IdeaLike::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(IdeaLike::IdeaId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(IdeaLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_like_user")
                            .from(IdeaLike::Table, IdeaLike::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_like_idea")
                            .from(IdeaLike::Table, IdeaLike::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, idea_id) - one like per user per idea
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_like_user_idea")
                    .table(IdeaLike::Table)
                    .col(IdeaLike::UserId)
                    .col(IdeaLike::IdeaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) - weekly quota lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_like_user_created_at")
                    .table(IdeaLike::Table)
                    .col(IdeaLike::UserId)
                    .col(IdeaLike::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: idea_id
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_like_idea_id")
                    .table(IdeaLike::Table)
                    .col(IdeaLike::IdeaId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IdeaLike::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IdeaLike {
    Table,
    Id,
    UserId,
    IdeaId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
}
