//! TrustCircle Advisor
//!
//! Advisory risk scoring for members. The report is informational: it is
//! stored on the member's profile and may flag it for manual review, but no
//! ledger transition reads it.

mod config;
mod error;
mod profile;
mod scorer;
mod service;

pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use profile::{AdvisoryProfile, InMemoryProfileStore, ProfileStore};
pub use scorer::{AdvisoryInput, AdvisoryReport, AdvisoryScorer, RiskTier, RuleBasedScorer, ScoreBreakdown};
pub use service::AdvisoryService;
