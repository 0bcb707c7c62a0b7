//! Poll repository.

use std::str::FromStr;

use quickpoll_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType, Order,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    sea_query::{Expr, Func},
};
use serde::Deserialize;

use crate::entities::{Poll, poll};

/// Sort order for public poll listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollSort {
    /// Most recently updated first.
    UpdatedAtDesc,
    /// Least recently updated first.
    UpdatedAtAsc,
    /// Newest first.
    CreatedAtDesc,
    /// Oldest first.
    CreatedAtAsc,
    /// Question, A to Z.
    QuestionAsc,
    /// Question, Z to A.
    QuestionDesc,
    /// Most votes first.
    #[default]
    TotalVotesDesc,
    /// Fewest votes first.
    TotalVotesAsc,
}

impl PollSort {
    /// Wire name of this sort order.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdatedAtDesc => "updated_at_desc",
            Self::UpdatedAtAsc => "updated_at_asc",
            Self::CreatedAtDesc => "created_at_desc",
            Self::CreatedAtAsc => "created_at_asc",
            Self::QuestionAsc => "question_asc",
            Self::QuestionDesc => "question_desc",
            Self::TotalVotesDesc => "total_votes_desc",
            Self::TotalVotesAsc => "total_votes_asc",
        }
    }
}

impl FromStr for PollSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updated_at_desc" => Ok(Self::UpdatedAtDesc),
            "updated_at_asc" => Ok(Self::UpdatedAtAsc),
            "created_at_desc" => Ok(Self::CreatedAtDesc),
            "created_at_asc" => Ok(Self::CreatedAtAsc),
            "question_asc" => Ok(Self::QuestionAsc),
            "question_desc" => Ok(Self::QuestionDesc),
            "total_votes_desc" => Ok(Self::TotalVotesDesc),
            "total_votes_asc" => Ok(Self::TotalVotesAsc),
            other => Err(AppError::Validation(format!("Unknown sort order: {other}"))),
        }
    }
}

/// Filter for public poll listings.
#[derive(Debug, Clone, Default)]
pub struct PollListFilter {
    /// Case-insensitive substring matched against question and creator name.
    pub search: Option<String>,
    /// Result order.
    pub sort: PollSort,
    /// Maximum number of polls returned.
    pub limit: u64,
    /// Number of polls skipped.
    pub offset: u64,
}

/// Poll repository for database operations.
///
/// Works against any connection, so engines can hand it a transaction.
#[derive(Clone, Copy)]
pub struct PollRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> PollRepository<'a, C> {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Get a poll by ID holding a shared row lock until the transaction ends.
    ///
    /// Ballots take this lock so they do not block each other but do block
    /// structural edits.
    pub async fn get_for_share(&self, id: &str) -> AppResult<poll::Model> {
        Poll::find_by_id(id)
            .lock_shared()
            .one(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?
            .ok_or_else(|| not_found(id))
    }

    /// Get a poll by ID holding an exclusive row lock until the transaction ends.
    pub async fn get_for_update(&self, id: &str) -> AppResult<poll::Model> {
        Poll::find_by_id(id)
            .lock_exclusive()
            .one(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?
            .ok_or_else(|| not_found(id))
    }

    /// Find polls by IDs (unordered).
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<poll::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Poll::find()
            .filter(poll::Column::Id.is_in(ids.to_vec()))
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// List public polls.
    pub async fn find_public(&self, filter: &PollListFilter) -> AppResult<Vec<poll::Model>> {
        let mut query = Poll::find().filter(poll::Column::IsPublic.eq(true));

        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((Poll, poll::Column::Question))))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            Poll,
                            poll::Column::CreatorDisplayName,
                        ))))
                        .like(pattern),
                    ),
            );
        }

        apply_sort(query, filter.sort)
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_asc(poll::Column::Id)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .insert(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Delete a poll row. Returns the number of rows removed.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let result = Poll::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Poll with ID '{id}' not found."))
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn apply_sort(query: Select<Poll>, sort: PollSort) -> Select<Poll> {
    match sort {
        PollSort::UpdatedAtDesc => query.order_by_desc(poll::Column::UpdatedAt),
        PollSort::UpdatedAtAsc => query.order_by_asc(poll::Column::UpdatedAt),
        PollSort::CreatedAtDesc => query.order_by_desc(poll::Column::CreatedAt),
        PollSort::CreatedAtAsc => query.order_by_asc(poll::Column::CreatedAt),
        PollSort::QuestionAsc => query.order_by(Expr::cust("LOWER(poll.question)"), Order::Asc),
        PollSort::QuestionDesc => query.order_by(Expr::cust("LOWER(poll.question)"), Order::Desc),
        PollSort::TotalVotesDesc => with_vote_totals(query)
            .order_by(Expr::cust("COALESCE(SUM(poll_option.votes), 0)"), Order::Desc),
        PollSort::TotalVotesAsc => with_vote_totals(query)
            .order_by(Expr::cust("COALESCE(SUM(poll_option.votes), 0)"), Order::Asc),
    }
}

fn with_vote_totals(query: Select<Poll>) -> Select<Poll> {
    query
        .join(JoinType::LeftJoin, poll::Relation::PollOption.def())
        .group_by(poll::Column::Id)
}
