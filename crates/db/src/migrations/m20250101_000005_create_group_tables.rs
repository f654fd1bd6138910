//! Create idea group, membership, message and read receipt tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IdeaGroup::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IdeaGroup::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(IdeaGroup::IdeaId).string_len(32).not_null())
                    .col(ColumnDef::new(IdeaGroup::Name).string_len(255).not_null())
                    .col(ColumnDef::new(IdeaGroup::Description).text())
                    .col(ColumnDef::new(IdeaGroup::CreatedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(IdeaGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IdeaGroup::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_group_idea")
                            .from(IdeaGroup::Table, IdeaGroup::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_group_created_by")
                            .from(IdeaGroup::Table, IdeaGroup::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: idea_id - exactly one group per idea
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_group_idea_id")
                    .table(IdeaGroup::Table)
                    .col(IdeaGroup::IdeaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMember::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupMember::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(GroupMember::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMember::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(GroupMember::Role)
                            .string_len(20)
                            .not_null()
                            .default("MEMBER"),
                    )
                    .col(
                        ColumnDef::new(GroupMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_member_group")
                            .from(GroupMember::Table, GroupMember::GroupId)
                            .to(IdeaGroup::Table, IdeaGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_member_user")
                            .from(GroupMember::Table, GroupMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (group_id, user_id) - one membership per user per group
        manager
            .create_index(
                Index::create()
                    .name("idx_group_member_group_user")
                    .table(GroupMember::Table)
                    .col(GroupMember::GroupId)
                    .col(GroupMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_member_user_id")
                    .table(GroupMember::Table)
                    .col(GroupMember::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMessage::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::SenderId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessage::Content).text().not_null())
                    .col(
                        ColumnDef::new(GroupMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_group")
                            .from(GroupMessage::Table, GroupMessage::GroupId)
                            .to(IdeaGroup::Table, IdeaGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_sender")
                            .from(GroupMessage::Table, GroupMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_group_created_at")
                    .table(GroupMessage::Table)
                    .col(GroupMessage::GroupId)
                    .col(GroupMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMessageRead::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMessageRead::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMessageRead::MessageId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupMessageRead::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(GroupMessageRead::ReadAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_read_message")
                            .from(GroupMessageRead::Table, GroupMessageRead::MessageId)
                            .to(GroupMessage::Table, GroupMessage::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_message_read_user")
                            .from(GroupMessageRead::Table, GroupMessageRead::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (message_id, user_id) - one receipt per reader
        manager
            .create_index(
                Index::create()
                    .name("idx_group_message_read_message_user")
                    .table(GroupMessageRead::Table)
                    .col(GroupMessageRead::MessageId)
                    .col(GroupMessageRead::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMessageRead::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IdeaGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IdeaGroup {
    Table,
    Id,
    IdeaId,
    Name,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GroupMember {
    Table,
    Id,
    GroupId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(Iden)]
enum GroupMessage {
    Table,
    Id,
    GroupId,
    SenderId,
    Content,
    CreatedAt,
}

#[derive(Iden)]
enum GroupMessageRead {
    Table,
    Id,
    MessageId,
    UserId,
    ReadAt,
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
