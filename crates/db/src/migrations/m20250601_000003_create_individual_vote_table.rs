//! Create `individual_vote` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IndividualVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IndividualVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IndividualVote::PollId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualVote::OptionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualVote::VoterToken)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndividualVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_individual_vote_poll")
                            .from(IndividualVote::Table, IndividualVote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_individual_vote_option")
                            .from(IndividualVote::Table, IndividualVote::OptionId)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One ballot per (poll, option, voter token)
        manager
            .create_index(
                Index::create()
                    .name("idx_individual_vote_unique")
                    .table(IndividualVote::Table)
                    .col(IndividualVote::PollId)
                    .col(IndividualVote::OptionId)
                    .col(IndividualVote::VoterToken)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Ballot revision looks up a token's ballots within a poll
        manager
            .create_index(
                Index::create()
                    .name("idx_individual_vote_poll_id_voter_token")
                    .table(IndividualVote::Table)
                    .col(IndividualVote::PollId)
                    .col(IndividualVote::VoterToken)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_individual_vote_option_id")
                    .table(IndividualVote::Table)
                    .col(IndividualVote::OptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IndividualVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IndividualVote {
    Table,
    Id,
    PollId,
    OptionId,
    VoterToken,
    CreatedAt,
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
