//! Voter identity resolution.

use quickpoll_db::entities::poll::VotingSecurityLevel;

/// How a ballot should be attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterIdentity {
    /// Token of a returning voter; `None` means a fresh token is minted.
    pub token: Option<String>,
    /// Whether the caller should hand the resulting token back to the voter.
    pub persist_token: bool,
}

/// Decide which token a ballot is cast under.
///
/// Polls without voting security never track revisions: every ballot counts
/// as a first-time ballot and the minted token is not worth keeping. Every
/// other level honors the token the voter already holds. Blank tokens count
/// as absent.
#[must_use]
pub fn resolve(level: VotingSecurityLevel, supplied: Option<String>) -> VoterIdentity {
    match level {
        VotingSecurityLevel::None => VoterIdentity {
            token: None,
            persist_token: false,
        },
        VotingSecurityLevel::CookieBasic
        | VotingSecurityLevel::CookieStrict
        | VotingSecurityLevel::IpAddress => VoterIdentity {
            token: supplied.filter(|token| !token.trim().is_empty()),
            persist_token: true,
        },
    }
}
