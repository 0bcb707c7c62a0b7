//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod capability;
pub mod mutation;
pub mod poll;
pub mod voter_identity;

pub use ballot::{BallotService, CastVoteInput, VoteOutcome, validate_ballot};
pub use capability::{CapabilityVerifier, codes_match};
pub use mutation::{
    HistoryField, OptionTextUpdate, PollMutationService, PollSnapshot, UpdatePlan,
    UpdatePollInput, plan_update,
};
pub use poll::{CreatePollInput, CreatedPoll, ListPollsQuery, PollService, PollWithOptions};
pub use voter_identity::{VoterIdentity, resolve as resolve_voter_identity};
