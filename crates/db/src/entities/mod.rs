//! Database entities.

pub mod individual_vote;
pub mod poll;
pub mod poll_edit_history;
pub mod poll_option;

pub use individual_vote::Entity as IndividualVote;
pub use poll::Entity as Poll;
pub use poll_edit_history::Entity as PollEditHistory;
pub use poll_option::Entity as PollOption;
