//! Ledger errors

use chrono::{DateTime, Utc};
use strum_macros::Display;
use thiserror::Error;
use trustcircle_core::{Amount, MemberId};

use crate::circle::CircleId;
use crate::loan::LoanId;

/// Errors that can occur in ledger operations.
///
/// Every variant is raised before any store is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Authorization ===
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // === Validation ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Requested {requested} exceeds credit limit {limit}")]
    LimitExceeded { requested: Amount, limit: Amount },

    #[error("Payment must be exactly {expected}, got {actual}")]
    PaymentMismatch { expected: Amount, actual: Amount },

    #[error("Bond {actual} is below the minimum stake {minimum}")]
    StakeTooLow { minimum: Amount, actual: Amount },

    #[error("Member {member} already belongs to circle {circle}")]
    AlreadyInCircle { member: MemberId, circle: CircleId },

    #[error("Circle {circle} is full ({max} members)")]
    CircleFull { circle: CircleId, max: usize },

    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Circle not found: {0}")]
    CircleNotFound(CircleId),

    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    // === Resource ===
    #[error("Insufficient pool liquidity: available {available}, required {required}")]
    InsufficientLiquidity { available: Amount, required: Amount },

    // === State ===
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Member {0} already has an active loan")]
    ActiveLoanExists(MemberId),

    #[error("Loan {loan} is not default-eligible until after {eligible_after}")]
    NotDefaultEligible {
        loan: LoanId,
        eligible_after: DateTime<Utc>,
    },
}

/// Error class, used by callers deciding how to report a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    Authorization,
    Validation,
    Resource,
    State,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized(_) => ErrorKind::Authorization,
            LedgerError::InvalidInput(_)
            | LedgerError::LimitExceeded { .. }
            | LedgerError::PaymentMismatch { .. }
            | LedgerError::StakeTooLow { .. }
            | LedgerError::AlreadyInCircle { .. }
            | LedgerError::CircleFull { .. }
            | LedgerError::MemberNotFound(_)
            | LedgerError::CircleNotFound(_)
            | LedgerError::LoanNotFound(_) => ErrorKind::Validation,
            LedgerError::InsufficientLiquidity { .. } => ErrorKind::Resource,
            LedgerError::InvalidState(_)
            | LedgerError::ActiveLoanExists(_)
            | LedgerError::NotDefaultEligible { .. } => ErrorKind::State,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
