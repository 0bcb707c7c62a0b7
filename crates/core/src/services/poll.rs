//! Poll service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quickpoll_common::{AppError, AppResult, IdGenerator, PollConfig};
use quickpoll_db::{
    entities::{
        poll::{self, VotingSecurityLevel},
        poll_edit_history, poll_option,
    },
    repositories::{
        IndividualVoteRepository, PollEditHistoryRepository, PollListFilter, PollOptionRepository,
        PollRepository, PollSort,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ballot::{BallotService, CastVoteInput, VoteOutcome};
use super::capability::{self, CapabilityVerifier};
use super::mutation::{PollMutationService, UpdatePollInput};

/// Maximum length of an option text, in characters.
const MAX_OPTION_TEXT_LENGTH: usize = 200;

/// A poll together with its options in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollWithOptions {
    /// The poll row.
    #[serde(flatten)]
    pub poll: poll::Model,
    /// Options in creation order.
    pub options: Vec<poll_option::Model>,
}

impl PollWithOptions {
    /// Sum of the vote counters of all options.
    #[must_use]
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|o| i64::from(o.votes)).sum()
    }
}

/// A freshly created poll, carrying the code that unlocks edits.
///
/// The code is only ever handed out here.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPoll {
    /// The stored poll.
    #[serde(flatten)]
    pub poll: PollWithOptions,
    /// Secret required to edit or delete the poll.
    pub modification_code: String,
}

/// Input for creating a poll.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreatePollInput {
    /// Question put to voters.
    #[validate(length(min = 1, max = 500))]
    pub question: String,
    /// Creator name; a random one is picked when absent.
    #[validate(length(max = 100))]
    pub creator_display_name: Option<String>,
    /// Option texts in display order.
    #[validate(length(min = 2))]
    pub options: Vec<String>,
    /// Whether one ballot may select several options.
    #[serde(default)]
    pub allow_multiple_selections: bool,
    /// How voter tokens are honored.
    #[serde(default)]
    pub voting_security_level: VotingSecurityLevel,
    /// Whether the poll is listed publicly.
    #[serde(default)]
    pub is_public: bool,
}

/// Query for public poll listings.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListPollsQuery {
    /// Substring matched against question and creator name.
    #[validate(length(min = 1, max = 100))]
    pub search: Option<String>,
    /// Result order.
    #[serde(default)]
    pub sort: PollSort,
    /// Page size; the configured default when absent.
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    /// Number of polls skipped.
    #[serde(default)]
    pub offset: u64,
}

/// Reject a text made of whitespace only.
pub(crate) fn ensure_not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Check an option text for shape: non-blank and not too long.
pub(crate) fn validate_option_text(text: &str) -> AppResult<()> {
    ensure_not_blank("option text", text)?;
    if text.chars().count() > MAX_OPTION_TEXT_LENGTH {
        return Err(AppError::Validation(format!(
            "option text must be at most {MAX_OPTION_TEXT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Build option rows for `texts`, with zero votes.
///
/// Creation times are spaced one microsecond apart so that listing by
/// creation time keeps the given order.
pub(crate) fn new_option_models(
    poll_id: &str,
    ids: &[String],
    texts: &[String],
    now: DateTime<Utc>,
) -> Vec<poll_option::ActiveModel> {
    ids.iter()
        .zip(texts)
        .zip(0_i64..)
        .map(|((id, text), offset)| {
            let created_at = now + Duration::microseconds(offset);
            poll_option::ActiveModel {
                id: Set(id.clone()),
                poll_id: Set(poll_id.to_string()),
                text: Set(text.clone()),
                votes: Set(0),
                created_at: Set(created_at.into()),
                updated_at: Set(created_at.into()),
            }
        })
        .collect()
}

/// Poll service: the entry point for every poll operation.
#[derive(Clone)]
pub struct PollService {
    db: Arc<DatabaseConnection>,
    config: PollConfig,
    id_gen: IdGenerator,
    ballots: BallotService,
    mutations: PollMutationService,
    capability: CapabilityVerifier,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: PollConfig) -> Self {
        let id_gen = IdGenerator::with_code_length(config.modification_code_length);
        Self {
            ballots: BallotService::new(Arc::clone(&db), id_gen.clone()),
            mutations: PollMutationService::new(
                Arc::clone(&db),
                id_gen.clone(),
                config.max_options,
            ),
            capability: CapabilityVerifier::new(Arc::clone(&db)),
            db,
            config,
            id_gen,
        }
    }

    /// Create a poll with its options in one transaction.
    pub async fn create_poll(&self, input: CreatePollInput) -> AppResult<CreatedPoll> {
        input.validate()?;
        ensure_not_blank("question", &input.question)?;

        if input.options.len() > self.config.max_options {
            return Err(AppError::Validation(format!(
                "A poll can have at most {} options",
                self.config.max_options
            )));
        }

        let mut seen = HashSet::with_capacity(input.options.len());
        for text in &input.options {
            validate_option_text(text)?;
            if !seen.insert(text.to_lowercase()) {
                return Err(AppError::DuplicateOptionText(text.clone()));
            }
        }

        let creator_display_name = match input.creator_display_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                let name = self.id_gen.generate_display_name();
                tracing::debug!(name = %name, "Generated creator display name");
                name
            }
        };

        let poll_id = self.id_gen.generate();
        let modification_code = self.id_gen.generate_modification_code();
        let now = Utc::now();

        let model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            question: Set(input.question),
            creator_display_name: Set(Some(creator_display_name)),
            allow_multiple_selections: Set(input.allow_multiple_selections),
            voting_security_level: Set(input.voting_security_level),
            is_public: Set(input.is_public),
            modification_code: Set(modification_code.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let option_ids: Vec<String> = input.options.iter().map(|_| self.id_gen.generate()).collect();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let poll = PollRepository::new(&txn).create(model).await?;
        let option_repo = PollOptionRepository::new(&txn);
        option_repo
            .insert_many(new_option_models(&poll_id, &option_ids, &input.options, now))
            .await?;
        let options = option_repo.find_by_poll(&poll_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        tracing::info!(poll_id = %poll_id, options = options.len(), "Poll created");

        Ok(CreatedPoll {
            poll: PollWithOptions { poll, options },
            modification_code,
        })
    }

    /// Get a poll with its options.
    pub async fn get_poll(&self, poll_id: &str) -> AppResult<PollWithOptions> {
        tracing::debug!(poll_id = poll_id, "Fetching poll");

        let conn = self.db.as_ref();
        let poll = PollRepository::new(conn).get_by_id(poll_id).await?;
        let options = PollOptionRepository::new(conn).find_by_poll(poll_id).await?;

        Ok(PollWithOptions { poll, options })
    }

    /// List public polls.
    pub async fn list_polls(&self, query: ListPollsQuery) -> AppResult<Vec<PollWithOptions>> {
        query.validate()?;

        let limit = query
            .limit
            .unwrap_or(self.config.default_list_limit)
            .clamp(1, self.config.max_list_limit);
        let filter = PollListFilter {
            search: query.search.filter(|s| !s.trim().is_empty()),
            sort: query.sort,
            limit,
            offset: query.offset,
        };

        tracing::debug!(sort = filter.sort.as_str(), limit = limit, offset = filter.offset, "Listing polls");

        let conn = self.db.as_ref();
        let polls = PollRepository::new(conn).find_public(&filter).await?;
        attach_options(conn, polls).await
    }

    /// Get several polls at once, in the order requested.
    ///
    /// Unknown IDs are skipped; repeated IDs repeat the poll.
    pub async fn get_polls_by_ids(&self, ids: &[String]) -> AppResult<Vec<PollWithOptions>> {
        if ids.is_empty() || ids.len() > self.config.max_batch_ids {
            return Err(AppError::Validation(format!(
                "Between 1 and {} poll IDs must be requested",
                self.config.max_batch_ids
            )));
        }

        tracing::debug!(requested = ids.len(), "Fetching polls by IDs");

        let conn = self.db.as_ref();
        let found = attach_options(conn, PollRepository::new(conn).find_by_ids(ids).await?).await?;
        let by_id: HashMap<&str, &PollWithOptions> =
            found.iter().map(|p| (p.poll.id.as_str(), p)).collect();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|p| (*p).clone()))
            .collect())
    }

    /// Cast a ballot.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        input: CastVoteInput,
        voter_token: Option<String>,
    ) -> AppResult<VoteOutcome> {
        self.ballots.cast_vote(poll_id, input, voter_token).await
    }

    /// Whether `code` unlocks the poll.
    pub async fn verify_modification_code(&self, poll_id: &str, code: &str) -> AppResult<bool> {
        self.capability.verify(poll_id, code).await
    }

    /// Update a poll.
    pub async fn update_poll(
        &self,
        poll_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<PollWithOptions> {
        self.mutations.update_poll(poll_id, input).await
    }

    /// Delete a poll together with everything it owns.
    pub async fn delete_poll(&self, poll_id: &str, code: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let poll_repo = PollRepository::new(&txn);
        let poll = poll_repo.get_for_update(poll_id).await?;
        capability::authorize(&poll, code)?;

        let history = PollEditHistoryRepository::new(&txn)
            .delete_by_poll(poll_id)
            .await?;
        let ballots = IndividualVoteRepository::new(&txn)
            .delete_by_poll(poll_id)
            .await?;
        let options = PollOptionRepository::new(&txn)
            .delete_by_poll(poll_id)
            .await?;
        poll_repo.delete(poll_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        tracing::info!(
            poll_id = poll_id,
            options = options,
            ballots = ballots,
            history_entries = history,
            "Poll deleted"
        );

        Ok(())
    }

    /// Get the edit history of a poll, most recent first.
    pub async fn get_edit_history(
        &self,
        poll_id: &str,
    ) -> AppResult<Vec<poll_edit_history::Model>> {
        let conn = self.db.as_ref();
        PollRepository::new(conn).get_by_id(poll_id).await?;

        let entries = PollEditHistoryRepository::new(conn)
            .find_by_poll(poll_id)
            .await?;
        tracing::debug!(poll_id = poll_id, count = entries.len(), "Fetched edit history");

        Ok(entries)
    }
}

/// Load the options of `polls` with one query, keeping the poll order.
async fn attach_options(
    conn: &DatabaseConnection,
    polls: Vec<poll::Model>,
) -> AppResult<Vec<PollWithOptions>> {
    let ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
    let mut by_poll: HashMap<String, Vec<poll_option::Model>> = HashMap::new();
    for option in PollOptionRepository::new(conn).find_by_polls(&ids).await? {
        by_poll.entry(option.poll_id.clone()).or_default().push(option);
    }

    Ok(polls
        .into_iter()
        .map(|poll| {
            let options = by_poll.remove(&poll.id).unwrap_or_default();
            PollWithOptions { poll, options }
        })
        .collect())
}
