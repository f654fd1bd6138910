//! Create file attachment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileAttachment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileAttachment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FileAttachment::IdeaId).string_len(32).not_null())
                    .col(ColumnDef::new(FileAttachment::UploadedBy).string_len(32).not_null())
                    .col(ColumnDef::new(FileAttachment::Filename).string_len(255).not_null())
                    .col(ColumnDef::new(FileAttachment::OriginalName).string_len(255).not_null())
                    .col(ColumnDef::new(FileAttachment::FilePath).string_len(500).not_null())
                    .col(ColumnDef::new(FileAttachment::MimeType).string_len(100).not_null())
                    .col(ColumnDef::new(FileAttachment::FileSize).big_integer().not_null())
                    .col(
                        ColumnDef::new(FileAttachment::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_attachment_idea")
                            .from(FileAttachment::Table, FileAttachment::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_attachment_uploaded_by")
                            .from(FileAttachment::Table, FileAttachment::UploadedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_file_attachment_idea_id")
                    .table(FileAttachment::Table)
                    .col(FileAttachment::IdeaId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FileAttachment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FileAttachment {
    Table,
    Id,
    IdeaId,
    UploadedBy,
    Filename,
    OriginalName,
    FilePath,
    MimeType,
    FileSize,
    UploadedAt,
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
