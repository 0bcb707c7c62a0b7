//! Individual ballot repository.

use std::collections::HashMap;

use quickpoll_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, sea_query::Expr,
};

use crate::entities::{IndividualVote, individual_vote};

/// Ballot repository for database operations.
#[derive(Clone, Copy)]
pub struct IndividualVoteRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> IndividualVoteRepository<'a, C> {
    /// Create a new ballot repository.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find the live ballots of a voter token within a poll.
    pub async fn find_by_poll_and_token(
        &self,
        poll_id: &str,
        voter_token: &str,
    ) -> AppResult<Vec<individual_vote::Model>> {
        IndividualVote::find()
            .filter(individual_vote::Column::PollId.eq(poll_id))
            .filter(individual_vote::Column::VoterToken.eq(voter_token))
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Count live ballots per option of a poll.
    ///
    /// Options without ballots are absent from the map.
    pub async fn count_by_option(&self, poll_id: &str) -> AppResult<HashMap<String, u64>> {
        let rows: Vec<(String, i64)> = IndividualVote::find()
            .select_only()
            .column(individual_vote::Column::OptionId)
            .column_as(Expr::col(individual_vote::Column::Id).count(), "ballots")
            .filter(individual_vote::Column::PollId.eq(poll_id))
            .group_by(individual_vote::Column::OptionId)
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(option_id, ballots)| (option_id, ballots.max(0) as u64))
            .collect())
    }

    /// Insert several ballots at once.
    pub async fn insert_many(&self, models: Vec<individual_vote::ActiveModel>) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        IndividualVote::insert_many(models)
            .exec_without_returning(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Delete one ballot. Returns the number of rows removed.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let result = IndividualVote::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete every ballot of a poll.
    pub async fn delete_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        let result = IndividualVote::delete_many()
            .filter(individual_vote::Column::PollId.eq(poll_id))
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_ballot(id: &str, option_id: &str, token: &str) -> individual_vote::Model {
        individual_vote::Model {
            id: id.to_string(),
            poll_id: "poll1".to_string(),
            option_id: option_id.to_string(),
            voter_token: token.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_poll_and_token() {
        let ballot1 = create_test_ballot("v1", "opt1", "token-a");
        let ballot2 = create_test_ballot("v2", "opt2", "token-a");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[ballot1, ballot2]])
            .into_connection();

        let repo = IndividualVoteRepository::new(&db);
        let result = repo.find_by_poll_and_token("poll1", "token-a").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|b| b.voter_token == "token-a"));
    }

    #[tokio::test]
    async fn test_delete_reports_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let repo = IndividualVoteRepository::new(&db);

        assert_eq!(repo.delete("v1").await.unwrap(), 1);
        assert_eq!(repo.delete("v1").await.unwrap(), 0);
    }
}
