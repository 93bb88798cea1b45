//! Advisor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scorer::RiskTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Upper bound on a single scorer call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Profiles at or above this tier are flagged for manual review
    #[serde(default = "default_review_tier")]
    pub review_tier: RiskTier,
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_review_tier() -> RiskTier {
    RiskTier::High
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            review_tier: default_review_tier(),
        }
    }
}

impl AdvisorConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn needs_review(&self, tier: RiskTier) -> bool {
        tier >= self.review_tier
    }
}
