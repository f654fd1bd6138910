//! Create idea and checklist item tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Idea::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Idea::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Idea::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Idea::Description).text().not_null())
                    .col(ColumnDef::new(Idea::Category).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Idea::Tags)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(ColumnDef::new(Idea::AuthorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Idea::Status)
                            .string_len(20)
                            .not_null()
                            .default("CONCEPT"),
                    )
                    .col(
                        ColumnDef::new(Idea::ProgressPercentage)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(
                                Expr::col(Idea::ProgressPercentage)
                                    .gte(0)
                                    .and(Expr::col(Idea::ProgressPercentage).lte(100)),
                            ),
                    )
                    .col(ColumnDef::new(Idea::LikeCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Idea::CommentCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Idea::ViewCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Idea::IsFeatured).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Idea::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Idea::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_author")
                            .from(Idea::Table, Idea::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for listing a user's ideas)
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_author_id")
                    .table(Idea::Table)
                    .col(Idea::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: category
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_category")
                    .table(Idea::Table)
                    .col(Idea::Category)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (for newest-first listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_created_at")
                    .table(Idea::Table)
                    .col(Idea::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChecklistItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChecklistItem::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChecklistItem::IdeaId).string_len(32).not_null())
                    .col(ColumnDef::new(ChecklistItem::Title).string_len(200).not_null())
                    .col(
                        ColumnDef::new(ChecklistItem::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChecklistItem::OrdinalPosition)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChecklistItem::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ChecklistItem::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklist_item_idea")
                            .from(ChecklistItem::Table, ChecklistItem::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_checklist_item_idea_ordinal")
                    .table(ChecklistItem::Table)
                    .col(ChecklistItem::IdeaId)
                    .col(ChecklistItem::OrdinalPosition)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChecklistItem::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Idea::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
    Title,
    Description,
    Category,
    Tags,
    AuthorId,
    Status,
    ProgressPercentage,
    LikeCount,
    CommentCount,
    ViewCount,
    IsFeatured,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ChecklistItem {
    Table,
    Id,
    IdeaId,
    Title,
    IsCompleted,
    OrdinalPosition,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
