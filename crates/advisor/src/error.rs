//! Advisor error types

use thiserror::Error;
use trustcircle_core::MemberId;

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Scorer did not answer in time
    #[error("Advisory scoring for {member} timed out after {timeout_ms}ms")]
    Timeout { member: MemberId, timeout_ms: u64 },

    #[error("Advisory scoring failed: {0}")]
    ScoringFailed(String),

    #[error("Profile already exists: {0}")]
    ProfileExists(MemberId),

    #[error("Profile not found: {0}")]
    ProfileNotFound(MemberId),

    #[error("Member not found in ledger: {0}")]
    UnknownMember(MemberId),

    #[error("Invalid advisor config: {0}")]
    InvalidConfig(String),
}
