//! Advisory scorer trait and the rule-based implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use trustcircle_core::MemberId;
use trustcircle_ledger::TrustLedger;

use crate::error::AdvisorError;

/// Facts about a member the scorer looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryInput {
    pub member: MemberId,
    pub wallet_age_days: u32,
    pub prior_loans: u32,
    pub repaid_loans: u32,
    pub verified: bool,
    pub in_circle: bool,
}

impl AdvisoryInput {
    /// Snapshot loan history and circle membership from the ledger.
    /// Wallet age and verification come from outside the ledger.
    pub fn from_ledger(
        ledger: &TrustLedger,
        member: &MemberId,
        wallet_age_days: u32,
        verified: bool,
    ) -> Result<Self, AdvisorError> {
        let record = ledger
            .member(member)
            .ok_or_else(|| AdvisorError::UnknownMember(member.clone()))?;

        Ok(Self {
            member: member.clone(),
            wallet_age_days,
            prior_loans: ledger.loans_of(member).count() as u32,
            repaid_loans: record.loans_completed,
            verified,
            in_circle: record.circle.is_some(),
        })
    }
}

/// Risk tier, ordered from least to most risky
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn for_total(total: u32) -> Self {
        match total {
            40.. => RiskTier::Low,
            20.. => RiskTier::Medium,
            _ => RiskTier::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0-20
    pub wallet_age: u32,
    /// 0-20
    pub loan_history: u32,
    /// 0-10
    pub verification: u32,
    /// 0-10
    pub circle: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.wallet_age + self.loan_history + self.verification + self.circle
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryReport {
    pub member: MemberId,
    pub breakdown: ScoreBreakdown,
    /// 0-60
    pub total: u32,
    pub tier: RiskTier,
    pub rationale: String,
    /// Which scorer produced the report
    pub source: String,
}

/// Advisory scorer - interface for risk assessment backends
///
/// Implementations may call out to remote services and be slow; callers
/// bound them with a timeout.
#[async_trait]
pub trait AdvisoryScorer: Send + Sync {
    async fn score(&self, input: &AdvisoryInput) -> Result<AdvisoryReport, AdvisorError>;

    fn name(&self) -> &'static str;
}

/// Deterministic scorer based on fixed rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer;

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn wallet_age_points(days: u32) -> u32 {
        match days {
            365.. => 20,
            180.. => 15,
            90.. => 10,
            30.. => 5,
            _ => 0,
        }
    }

    /// Repaid share of prior loans scaled to 20. No history scores 5.
    pub fn history_points(prior_loans: u32, repaid_loans: u32) -> u32 {
        if prior_loans == 0 {
            return 5;
        }
        (repaid_loans.min(prior_loans) * 20) / prior_loans
    }

    pub fn breakdown(input: &AdvisoryInput) -> ScoreBreakdown {
        ScoreBreakdown {
            wallet_age: Self::wallet_age_points(input.wallet_age_days),
            loan_history: Self::history_points(input.prior_loans, input.repaid_loans),
            verification: if input.verified { 10 } else { 0 },
            circle: if input.in_circle { 10 } else { 0 },
        }
    }
}

#[async_trait]
impl AdvisoryScorer for RuleBasedScorer {
    async fn score(&self, input: &AdvisoryInput) -> Result<AdvisoryReport, AdvisorError> {
        let breakdown = Self::breakdown(input);
        let total = breakdown.total();
        let tier = RiskTier::for_total(total);

        let rationale = format!(
            "wallet age {}d: {}/20, history {}/{} repaid: {}/20, verified: {}/10, circle: {}/10",
            input.wallet_age_days,
            breakdown.wallet_age,
            input.repaid_loans,
            input.prior_loans,
            breakdown.loan_history,
            breakdown.verification,
            breakdown.circle,
        );

        Ok(AdvisoryReport {
            member: input.member.clone(),
            breakdown,
            total,
            tier,
            rationale,
            source: self.name().to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}
