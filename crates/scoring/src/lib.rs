//! TrustCircle Scoring - Pure scoring and credit policy
//!
//! Nothing in this crate touches ledger state. The ledger feeds it member
//! scores and circle status and gets back numbers.
//!
//! - `engine`: individual/circle score blending (60/40)
//! - `policy`: trust score -> credit tier (max loan, interest rate)

pub mod engine;
pub mod policy;

pub use engine::{ScoreEngine, CIRCLE_WEIGHT, INDIVIDUAL_WEIGHT};
pub use policy::{CreditPolicy, CreditTier, LoanQuote};
