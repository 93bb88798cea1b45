//! TrustCircle Ledger - Trust scoring and loan lifecycle
//!
//! This is the HEART of TrustCircle. Every change to a score, a circle, a
//! loan or the pool goes through `TrustLedger`.
//!
//! # Key Types
//! - `CircleRegistry`: circle creation, membership and one-way activation
//! - `MemberLedger`: per-member score and financial counters
//! - `LoanLedger`: request -> approve/disburse -> repay | default
//! - `DefaultHandler`: score cascade across a defaulter's circle
//! - `LiquidityPool`: admin-controlled reservoir funding disbursements
//! - `TrustLedger`: single-writer facade tying the stores together
//!
//! Every operation validates all guards before touching any store, so a
//! rejected call leaves the ledger exactly as it was.

pub mod admin;
pub mod circle;
pub mod command;
pub mod config;
pub mod default;
pub mod error;
pub mod ledger;
pub mod loan;
pub mod member;
pub mod pool;

pub use admin::AdminCap;
pub use circle::{Circle, CircleId, CircleRegistry, JoinOutcome};
pub use command::{Command, LedgerEvent};
pub use config::LedgerConfig;
pub use default::{DefaultHandler, DefaultOutcome, PeerPenalty};
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::TrustLedger;
pub use loan::{Loan, LoanId, LoanLedger, LoanStatus, RepaymentOutcome};
pub use member::{Member, MemberLedger};
pub use pool::LiquidityPool;
