//! Ballot engine: casting, revising and tallying votes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use quickpoll_common::{AppError, AppResult, IdGenerator};
use quickpoll_db::{
    entities::{individual_vote, poll, poll_option},
    repositories::{IndividualVoteRepository, PollOptionRepository, PollRepository},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;

use super::poll::PollWithOptions;
use super::voter_identity;

/// Input for casting a vote.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CastVoteInput {
    /// Options chosen by the voter.
    pub selected_option_ids: Vec<String>,
}

/// Result of a successful vote.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// The poll with refreshed tallies.
    pub poll: PollWithOptions,
    /// Token minted for a first-time voter.
    pub new_token: Option<String>,
    /// Whether the caller should hand the token back to the voter.
    pub persist_token: bool,
}

/// Check a selection against the poll it targets.
///
/// Checks run in a fixed order so the first failing rule decides the error.
pub fn validate_ballot(
    poll: &poll::Model,
    options: &[poll_option::Model],
    selected: &[String],
) -> AppResult<()> {
    let known: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
    if let Some(unknown) = selected.iter().find(|id| !known.contains(id.as_str())) {
        return Err(AppError::InvalidVote(format!(
            "Option ID {unknown} is not valid for this poll."
        )));
    }

    if !poll.allow_multiple_selections && selected.len() > 1 {
        return Err(AppError::InvalidVote(
            "Multiple options selected for a poll that does not allow it.".to_string(),
        ));
    }

    if selected.is_empty() {
        return Err(AppError::InvalidVote(
            "No options were selected for voting.".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(selected.len());
    if let Some(duplicate) = selected.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(AppError::InvalidVote(format!(
            "Option ID {duplicate} was selected more than once."
        )));
    }

    Ok(())
}

/// Records ballots and keeps option tallies in step with them.
#[derive(Clone)]
pub struct BallotService {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, id_gen: IdGenerator) -> Self {
        Self { db, id_gen }
    }

    /// Cast a ballot, replacing any earlier ballot of the same voter.
    ///
    /// Runs in one transaction holding a shared lock on the poll row, so
    /// concurrent voters proceed together while structural edits wait.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        input: CastVoteInput,
        voter_token: Option<String>,
    ) -> AppResult<VoteOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let poll = PollRepository::new(&txn).get_for_share(poll_id).await?;
        let option_repo = PollOptionRepository::new(&txn);
        let options = option_repo.find_by_poll(poll_id).await?;

        if let Err(e) = validate_ballot(&poll, &options, &input.selected_option_ids) {
            tracing::warn!(poll_id = poll_id, error = %e, "Ballot rejected");
            return Err(e);
        }

        let identity = voter_identity::resolve(poll.voting_security_level, voter_token);
        let vote_repo = IndividualVoteRepository::new(&txn);

        let (token, new_token, removed) = match identity.token {
            Some(token) => {
                let removed = clear_previous(&vote_repo, poll_id, &token).await?;
                tracing::debug!(poll_id = poll_id, cleared = removed.len(), "Revising ballot");
                (token, None, removed)
            }
            None => {
                let token = self.id_gen.generate_voter_token();
                (token.clone(), Some(token), Vec::new())
            }
        };

        let now = Utc::now();
        let ballots = input
            .selected_option_ids
            .iter()
            .map(|option_id| individual_vote::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.to_string()),
                option_id: Set(option_id.clone()),
                voter_token: Set(token.clone()),
                created_at: Set(now.into()),
            })
            .collect();
        vote_repo.insert_many(ballots).await?;

        // Counter rows are always locked in ascending id order.
        for (option_id, delta) in tally_deltas(&removed, &input.selected_option_ids) {
            for _ in 0..delta.unsigned_abs() {
                if delta > 0 {
                    option_repo.increment_votes(option_id).await?;
                } else {
                    option_repo.decrement_votes(option_id).await?;
                }
            }
        }

        let options = option_repo.find_by_poll(poll_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        tracing::info!(
            poll_id = poll_id,
            selections = input.selected_option_ids.len(),
            revised = new_token.is_none(),
            "Vote recorded"
        );

        Ok(VoteOutcome {
            poll: PollWithOptions { poll, options },
            new_token,
            persist_token: identity.persist_token,
        })
    }
}

/// Delete a voter's live ballots on a poll. Returns the option ids of the
/// ballots actually removed, so a tally is only decremented for a ballot
/// that existed.
async fn clear_previous<C: ConnectionTrait>(
    vote_repo: &IndividualVoteRepository<'_, C>,
    poll_id: &str,
    voter_token: &str,
) -> AppResult<Vec<String>> {
    let previous = vote_repo.find_by_poll_and_token(poll_id, voter_token).await?;

    let mut removed = Vec::with_capacity(previous.len());
    for ballot in previous {
        if vote_repo.delete(&ballot.id).await? == 1 {
            removed.push(ballot.option_id);
        }
    }

    Ok(removed)
}

/// Net tally change per option, keyed in ascending option id order.
/// Options whose removed and added ballots cancel out are left out.
fn tally_deltas<'a>(removed: &'a [String], selected: &'a [String]) -> BTreeMap<&'a str, i32> {
    let mut deltas = BTreeMap::new();
    for option_id in removed {
        *deltas.entry(option_id.as_str()).or_insert(0) -= 1;
    }
    for option_id in selected {
        *deltas.entry(option_id.as_str()).or_insert(0) += 1;
    }
    deltas.retain(|_, delta| *delta != 0);
    deltas
}
