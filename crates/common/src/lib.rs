//! Common utilities and shared types for quickpoll.
//!
//! This crate provides foundational components used across all quickpoll crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULIDs, voter tokens and modification codes via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use quickpoll_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::with_code_length(config.polls.modification_code_length);
//!     let code = id_gen.generate_modification_code();
//!     println!("Generated code: {}", code);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{Config, DatabaseConfig, LoggingConfig, PollConfig};
pub use error::{AppError, AppResult, ErrorBody};
pub use id::IdGenerator;
