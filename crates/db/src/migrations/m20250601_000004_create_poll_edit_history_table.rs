//! Create `poll_edit_history` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollEditHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollEditHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PollEditHistory::PollId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollEditHistory::EditedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PollEditHistory::FieldChanged)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PollEditHistory::OptionIdChanged).string_len(32))
                    .col(ColumnDef::new(PollEditHistory::OldValue).text())
                    .col(ColumnDef::new(PollEditHistory::NewValue).text())
                    .col(ColumnDef::new(PollEditHistory::ChangeDescription).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_edit_history_poll")
                            .from(PollEditHistory::Table, PollEditHistory::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // History must outlive the option it mentions
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_edit_history_option")
                            .from(PollEditHistory::Table, PollEditHistory::OptionIdChanged)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_edit_history_poll_id_edited_at")
                    .table(PollEditHistory::Table)
                    .col(PollEditHistory::PollId)
                    .col(PollEditHistory::EditedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollEditHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollEditHistory {
    Table,
    Id,
    PollId,
    EditedAt,
    FieldChanged,
    OptionIdChanged,
    OldValue,
    NewValue,
    ChangeDescription,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
}
