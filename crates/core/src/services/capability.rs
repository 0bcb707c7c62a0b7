//! Modification code verification.
//!
//! A poll's modification code is a bearer secret: whoever holds it may edit
//! or delete the poll. Codes are compared in constant time and never logged.

use std::sync::Arc;

use quickpoll_common::{AppError, AppResult};
use quickpoll_db::{entities::poll, repositories::PollRepository};
use sea_orm::DatabaseConnection;
use subtle::ConstantTimeEq;

/// Compare a stored code with a candidate, case-sensitively.
///
/// The running time does not depend on where the two codes first differ.
#[must_use]
pub fn codes_match(stored: &str, candidate: &str) -> bool {
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}

/// Reject a candidate code that does not unlock `poll`.
pub(crate) fn authorize(poll: &poll::Model, candidate: &str) -> AppResult<()> {
    if codes_match(&poll.modification_code, candidate) {
        Ok(())
    } else {
        tracing::warn!(poll_id = %poll.id, "Modification code mismatch");
        Err(AppError::InvalidCapability)
    }
}

/// Checks modification codes without mutating anything.
#[derive(Clone)]
pub struct CapabilityVerifier {
    db: Arc<DatabaseConnection>,
}

impl CapabilityVerifier {
    /// Create a new verifier.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Whether `code` is the modification code of the poll.
    ///
    /// A missing poll is reported as `false`, not as an error.
    pub async fn verify(&self, poll_id: &str, code: &str) -> AppResult<bool> {
        let Some(poll) = PollRepository::new(self.db.as_ref())
            .find_by_id(poll_id)
            .await?
        else {
            tracing::warn!(poll_id = poll_id, "Modification code checked against unknown poll");
            return Ok(false);
        };

        Ok(authorize(&poll, code).is_ok())
    }
}
