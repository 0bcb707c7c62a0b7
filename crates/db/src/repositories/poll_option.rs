//! Poll option repository.

use chrono::Utc;
use quickpoll_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, sea_query::Expr,
};

use crate::entities::{PollOption, poll_option};

/// Poll option repository for database operations.
#[derive(Clone, Copy)]
pub struct PollOptionRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PollOptionRepository<'a, C> {
    /// Create a new poll option repository.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find the options of a poll in creation order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::CreatedAt)
            .order_by_asc(poll_option::Column::Id)
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Find the options of several polls in creation order.
    pub async fn find_by_polls(&self, poll_ids: &[String]) -> AppResult<Vec<poll_option::Model>> {
        if poll_ids.is_empty() {
            return Ok(vec![]);
        }

        PollOption::find()
            .filter(poll_option::Column::PollId.is_in(poll_ids.to_vec()))
            .order_by_asc(poll_option::Column::CreatedAt)
            .order_by_asc(poll_option::Column::Id)
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Insert several options at once.
    pub async fn insert_many(&self, models: Vec<poll_option::ActiveModel>) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        PollOption::insert_many(models)
            .exec_without_returning(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Replace the text of an option.
    pub async fn update_text(&self, id: &str, text: &str) -> AppResult<()> {
        PollOption::update_many()
            .col_expr(poll_option::Column::Text, Expr::value(text))
            .col_expr(poll_option::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(poll_option::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Delete an option. Returns the number of rows removed.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let result = PollOption::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete every option of a poll.
    pub async fn delete_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        let result = PollOption::delete_many()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Increment the vote counter atomically.
    pub async fn increment_votes(&self, id: &str) -> AppResult<()> {
        PollOption::update_many()
            .col_expr(
                poll_option::Column::Votes,
                Expr::col(poll_option::Column::Votes).add(1),
            )
            .col_expr(poll_option::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(poll_option::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Decrement the vote counter atomically, never below zero.
    pub async fn decrement_votes(&self, id: &str) -> AppResult<()> {
        PollOption::update_many()
            .col_expr(
                poll_option::Column::Votes,
                Expr::cust("GREATEST(votes - 1, 0)"),
            )
            .col_expr(poll_option::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(poll_option::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }
}
