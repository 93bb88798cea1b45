//! Credit policy - trust score tiers
//!
//! | trust score | max loan | rate |
//! |-------------|----------|------|
//! | < 60        | 10       | 6%   |
//! | 60 - 69     | 20       | 4%   |
//! | 70 - 79     | 50       | 4%   |
//! | 80 - 89     | 100      | 2%   |
//! | >= 90       | 200      | 2%   |

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use trustcircle_core::{Amount, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CreditTier {
    Starter,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl CreditTier {
    pub fn for_score(score: Score) -> Self {
        match score.value() {
            0..=59 => CreditTier::Starter,
            60..=69 => CreditTier::Bronze,
            70..=79 => CreditTier::Silver,
            80..=89 => CreditTier::Gold,
            _ => CreditTier::Platinum,
        }
    }

    /// Maximum principal, in whole units
    pub fn max_loan_units(&self) -> u64 {
        match self {
            CreditTier::Starter => 10,
            CreditTier::Bronze => 20,
            CreditTier::Silver => 50,
            CreditTier::Gold => 100,
            CreditTier::Platinum => 200,
        }
    }

    /// Flat interest rate in percent
    pub fn rate_percent(&self) -> u32 {
        match self {
            CreditTier::Starter => 6,
            CreditTier::Bronze | CreditTier::Silver => 4,
            CreditTier::Gold | CreditTier::Platinum => 2,
        }
    }
}

/// Loan pricing fixed at request time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub principal: Amount,
    pub rate_percent: u32,
    pub interest: Amount,
    pub total_repayment: Amount,
}

/// Table-driven credit policy, no side effects
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditPolicy;

impl CreditPolicy {
    pub fn max_loan(score: Score) -> Amount {
        Amount::units(CreditTier::for_score(score).max_loan_units())
    }

    pub fn interest_rate(score: Score) -> u32 {
        CreditTier::for_score(score).rate_percent()
    }

    /// `floor(amount * rate / 100)`
    pub fn interest(amount: Amount, rate_percent: u32) -> Amount {
        amount.percent_floor(rate_percent)
    }

    /// Price a principal at the given trust score.
    ///
    /// Does not check the tier limit; callers compare against `max_loan`.
    pub fn quote(principal: Amount, score: Score) -> Option<LoanQuote> {
        let rate_percent = Self::interest_rate(score);
        let interest = Self::interest(principal, rate_percent);
        let total_repayment = principal.checked_add(&interest)?;
        Some(LoanQuote {
            principal,
            rate_percent,
            interest,
            total_repayment,
        })
    }
}
