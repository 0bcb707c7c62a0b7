//! Poll edit history repository.

use quickpoll_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{PollEditHistory, poll_edit_history};

/// Edit history repository. Rows are only ever appended or cascaded away.
#[derive(Clone, Copy)]
pub struct PollEditHistoryRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PollEditHistoryRepository<'a, C> {
    /// Create a new edit history repository.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Append history entries.
    pub async fn insert_many(
        &self,
        models: Vec<poll_edit_history::ActiveModel>,
    ) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        PollEditHistory::insert_many(models)
            .exec_without_returning(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }

    /// Get edit history for a poll (newest first).
    ///
    /// Entries written by one update share a timestamp; the serial ID keeps
    /// them in write order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_edit_history::Model>> {
        PollEditHistory::find()
            .filter(poll_edit_history::Column::PollId.eq(poll_id))
            .order_by_desc(poll_edit_history::Column::EditedAt)
            .order_by_desc(poll_edit_history::Column::Id)
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Delete every history entry of a poll.
    pub async fn delete_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        let result = PollEditHistory::delete_many()
            .filter(poll_edit_history::Column::PollId.eq(poll_id))
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
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_poll() {
        let entry = poll_edit_history::Model {
            id: 7,
            poll_id: "poll1".to_string(),
            edited_at: Utc::now().into(),
            field_changed: "option_removed".to_string(),
            option_id_changed: None,
            old_value: Some("Green".to_string()),
            new_value: None,
            change_description: Some("Option 'Green' (ID: opt3) removed.".to_string()),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[entry]])
            .into_connection();

        let repo = PollEditHistoryRepository::new(&db);
        let result = repo.find_by_poll("poll1").await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].field_changed, "option_removed");
        assert!(result[0].option_id_changed.is_none());
    }

    #[tokio::test]
    async fn test_insert_many_empty_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let repo = PollEditHistoryRepository::new(&db);
        assert!(repo.insert_many(vec![]).await.is_ok());
    }
}
