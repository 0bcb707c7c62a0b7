//! Database repositories.
//!
//! Every repository borrows a connection instead of owning one, so the same
//! code runs against the pool or inside a transaction.

pub mod individual_vote;
pub mod poll;
pub mod poll_edit_history;
pub mod poll_option;

pub use individual_vote::IndividualVoteRepository;
pub use poll::{PollListFilter, PollRepository, PollSort};
pub use poll_edit_history::PollEditHistoryRepository;
pub use poll_option::PollOptionRepository;
