//! Ledger configuration
//!
//! Thresholds live here rather than in code so a deployment can tune them
//! from a JSON file. Missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use trustcircle_core::{Amount, Score};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Minimum bond to create or join a circle
    #[serde(default = "default_minimum_stake")]
    pub minimum_stake: Amount,

    /// Circle capacity
    #[serde(default = "default_max_circle_members")]
    pub max_circle_members: usize,

    /// Member count at which a circle activates
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: usize,

    /// Individual score for newly registered members
    #[serde(default = "default_initial_score")]
    pub initial_score: Score,

    /// Loan term applied at disbursement (seconds)
    #[serde(default = "default_loan_duration_secs")]
    pub loan_duration_secs: u64,

    /// Days past the due date before a loan may be penalized as defaulted
    #[serde(default = "default_grace_days")]
    pub default_grace_days: i64,
}

fn default_minimum_stake() -> Amount {
    Amount::units(1)
}

fn default_max_circle_members() -> usize {
    10
}

fn default_activation_threshold() -> usize {
    3
}

fn default_initial_score() -> Score {
    Score::INITIAL
}

fn default_loan_duration_secs() -> u64 {
    7 * 24 * 60 * 60 // 7 days
}

fn default_grace_days() -> i64 {
    14
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            minimum_stake: default_minimum_stake(),
            max_circle_members: default_max_circle_members(),
            activation_threshold: default_activation_threshold(),
            initial_score: default_initial_score(),
            loan_duration_secs: default_loan_duration_secs(),
            default_grace_days: default_grace_days(),
        }
    }
}

/// Upper bound for loan terms and grace periods (ten years)
pub(crate) const MAX_TERM_DAYS: i64 = 3650;

impl LedgerConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        config
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Reject configurations that would break circle or loan invariants
    pub fn validate(&self) -> Result<(), String> {
        if self.activation_threshold < 2 || self.activation_threshold > self.max_circle_members {
            return Err(format!(
                "activation_threshold {} must be within 2..={}",
                self.activation_threshold, self.max_circle_members
            ));
        }
        if self.loan_duration_secs == 0 || self.loan_duration_secs > MAX_TERM_DAYS as u64 * 86_400 {
            return Err(format!(
                "loan_duration_secs must be within 1..={}",
                MAX_TERM_DAYS as u64 * 86_400
            ));
        }
        if !(0..=MAX_TERM_DAYS).contains(&self.default_grace_days) {
            return Err(format!("default_grace_days must be within 0..={}", MAX_TERM_DAYS));
        }
        Ok(())
    }

    /// Loan term as chrono Duration
    pub fn loan_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.loan_duration_secs as i64)
    }

    /// Default grace period as chrono Duration
    pub fn default_grace(&self) -> chrono::Duration {
        chrono::Duration::days(self.default_grace_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.minimum_stake.value(), dec!(1));
        assert_eq!(config.max_circle_members, 10);
        assert_eq!(config.activation_threshold, 3);
        assert_eq!(config.initial_score, Score::INITIAL);
        assert_eq!(config.loan_duration(), chrono::Duration::days(7));
        assert_eq!(config.default_grace(), chrono::Duration::days(14));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "minimum_stake": "0.5", "loan_duration_secs": 60 }"#;
        let config: LedgerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.minimum_stake.value(), dec!(0.5));
        assert_eq!(config.loan_duration(), chrono::Duration::seconds(60));
        assert_eq!(config.max_circle_members, 10); // default
    }

    #[test]
    fn test_validate_rejects_threshold_above_capacity() {
        let config = LedgerConfig {
            activation_threshold: 11,
            ..LedgerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
