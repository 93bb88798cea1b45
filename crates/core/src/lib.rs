//! TrustCircle Core - Domain types
//!
//! This crate contains the fundamental types used across TrustCircle:
//! - `Amount`: Non-negative decimal wrapper for pledged bonds, loans and pool funds
//! - `Score`: Trust score bounded to 0..=100
//! - `MemberId`: Validated wallet-style member identifier
//! - `Clock`: Injectable time source for due dates and grace periods

pub mod amount;
pub mod clock;
pub mod member_id;
pub mod score;

pub use amount::{Amount, AmountError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use member_id::{MemberId, MemberIdError};
pub use score::{Score, ScoreError};
