//! Create audit log table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditLog::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(AuditLog::UserId).string_len(32))
                    .col(ColumnDef::new(AuditLog::Action).string_len(20).not_null())
                    .col(ColumnDef::new(AuditLog::EntityType).string_len(50).not_null())
                    .col(ColumnDef::new(AuditLog::EntityId).string_len(32))
                    .col(ColumnDef::new(AuditLog::OldValue).json_binary())
                    .col(ColumnDef::new(AuditLog::NewValue).json_binary())
                    .col(
                        ColumnDef::new(AuditLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_entity")
                    .table(AuditLog::Table)
                    .col(AuditLog::EntityType)
                    .col(AuditLog::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_log_created_at")
                    .table(AuditLog::Table)
                    .col(AuditLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AuditLog {
    Table,
    Id,
    UserId,
    Action,
    EntityType,
    EntityId,
    OldValue,
    NewValue,
    CreatedAt,
}
