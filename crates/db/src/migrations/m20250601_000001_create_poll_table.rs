//! Create poll table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::Question).text().not_null())
                    .col(ColumnDef::new(Poll::CreatorDisplayName).string_len(128))
                    .col(
                        ColumnDef::new(Poll::AllowMultipleSelections)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::VotingSecurityLevel)
                            .string_len(16)
                            .not_null()
                            .default("cookie_basic"),
                    )
                    .col(
                        ColumnDef::new(Poll::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::ModificationCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Poll::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Public listings filter on visibility and sort by timestamps
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_is_public_updated_at")
                    .table(Poll::Table)
                    .col(Poll::IsPublic)
                    .col(Poll::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_created_at")
                    .table(Poll::Table)
                    .col(Poll::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Question,
    CreatorDisplayName,
    AllowMultipleSelections,
    VotingSecurityLevel,
    IsPublic,
    ModificationCode,
    CreatedAt,
    UpdatedAt,
}
