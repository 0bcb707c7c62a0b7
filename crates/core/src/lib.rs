//! Core poll logic for quickpoll: ballots, structural edits, capability
//! checks and the [`PollService`] facade tying them to the store.

pub mod services;

pub use services::*;
pub use quickpoll_db::repositories::PollSort;
