//! Loan ledger - the loan state machine
//!
//! ```text
//! Requested ──approve──────────────▶ Disbursed ──repay──▶ Repaid
//!     │                                  │
//!     └─approve_deferred─▶ Approved      └─(due passes)─▶ Overdue ──penalize──▶ Defaulted
//!                             │
//!                             └─disburse(payment == principal)─▶ Disbursed
//! ```
//!
//! Loans are priced once, at request time, and never deleted. Flags and
//! timestamps only move forward. Overdue and default eligibility are derived
//! from the stored due date and the caller-supplied `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;
use trustcircle_core::{Amount, MemberId, Score};
use trustcircle_scoring::{CreditPolicy, ScoreEngine};

use crate::circle::CircleRegistry;
use crate::error::{LedgerError, LedgerResult};
use crate::member::MemberLedger;
use crate::pool::LiquidityPool;

/// Repaid strictly before the due date
pub const EARLY_REPAYMENT_BONUS: i32 = 15;
/// Repaid at or after the due date, within `GRACE_WINDOW_DAYS`
pub const GRACE_REPAYMENT_BONUS: i32 = 10;
/// Repaid after the grace window but within `LATE_WINDOW_DAYS`.
///
/// Still a positive bonus, not a deduction.
pub const LATE_REPAYMENT_BONUS: i32 = 5;

pub const GRACE_WINDOW_DAYS: i64 = 3;
pub const LATE_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derived lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Requested,
    /// Approved, waiting for a direct disbursement
    Approved,
    Disbursed,
    Overdue,
    Repaid,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower: MemberId,
    pub principal: Amount,
    pub rate_percent: u32,
    pub interest: Amount,
    pub total_repayment: Amount,
    pub purpose: String,

    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub defaulted_at: Option<DateTime<Utc>>,

    pub approved: bool,
    pub disbursed: bool,
    pub repaid: bool,
    /// Set once the default penalty has been applied
    pub defaulted: bool,
}

impl Loan {
    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.repaid {
            LoanStatus::Repaid
        } else if self.defaulted {
            LoanStatus::Defaulted
        } else if self.is_overdue(now) {
            LoanStatus::Overdue
        } else if self.disbursed {
            LoanStatus::Disbursed
        } else if self.approved {
            LoanStatus::Approved
        } else {
            LoanStatus::Requested
        }
    }

    /// Disbursed, unpaid and past the due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.disbursed && !self.repaid && self.due_at.is_some_and(|due| now > due)
    }

    /// Instant after which the loan may be penalized
    pub fn default_eligible_after(&self, grace: Duration) -> Option<DateTime<Utc>> {
        self.due_at.and_then(|due| due.checked_add_signed(grace))
    }

    pub fn is_default_eligible(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.disbursed
            && !self.repaid
            && !self.defaulted
            && self
                .default_eligible_after(grace)
                .is_some_and(|after| now > after)
    }
}

/// Score bonus for repaying at `repaid_at` a loan due at `due_at`
pub fn credit_bonus(due_at: DateTime<Utc>, repaid_at: DateTime<Utc>) -> i32 {
    let late_by = repaid_at.signed_duration_since(due_at);
    if late_by < Duration::zero() {
        EARLY_REPAYMENT_BONUS
    } else if late_by <= Duration::days(GRACE_WINDOW_DAYS) {
        GRACE_REPAYMENT_BONUS
    } else if late_by <= Duration::days(LATE_WINDOW_DAYS) {
        LATE_REPAYMENT_BONUS
    } else {
        0
    }
}

/// Result of a successful repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentOutcome {
    pub bonus: i32,
    pub previous_score: Score,
    pub new_score: Score,
    pub loans_completed: u32,
}

/// Arena of loans indexed by `LoanId` (ids start at 1)
#[derive(Debug, Default, Clone)]
pub struct LoanLedger {
    loans: Vec<Loan>,
}

impl LoanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: LoanId) -> Option<&Loan> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.loans.get(index)
    }

    fn get_mut(&mut self, id: LoanId) -> Option<&mut Loan> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.loans.get_mut(index)
    }

    pub fn require(&self, id: LoanId) -> LedgerResult<&Loan> {
        self.get(id).ok_or(LedgerError::LoanNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loan> {
        self.loans.iter()
    }

    pub fn loans_of<'a>(&'a self, borrower: &'a MemberId) -> impl Iterator<Item = &'a Loan> {
        self.loans.iter().filter(move |l| &l.borrower == borrower)
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Open a loan request priced at the borrower's current trust score.
    pub fn request(
        &mut self,
        members: &mut MemberLedger,
        circles: &CircleRegistry,
        borrower: &MemberId,
        amount: Amount,
        purpose: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<LoanId> {
        let member = members.get(borrower).ok_or_else(|| {
            LedgerError::Unauthorized(format!("{} is not a circle member", borrower))
        })?;
        if !member.active {
            return Err(LedgerError::Unauthorized(format!(
                "{} is frozen",
                borrower
            )));
        }
        let in_active_circle = member
            .circle
            .and_then(|cid| circles.get(cid))
            .is_some_and(|c| c.active);
        if !in_active_circle {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not in an active circle",
                borrower
            )));
        }
        if member.has_active_loan {
            return Err(LedgerError::ActiveLoanExists(borrower.clone()));
        }
        if amount.is_zero() {
            return Err(LedgerError::InvalidInput("loan amount must be positive".into()));
        }
        let purpose = purpose.trim();
        if purpose.is_empty() {
            return Err(LedgerError::InvalidInput("loan purpose cannot be empty".into()));
        }

        let trust = members.trust_score(circles, borrower)?;
        let limit = CreditPolicy::max_loan(trust);
        if amount > limit {
            return Err(LedgerError::LimitExceeded {
                requested: amount,
                limit,
            });
        }
        let quote = CreditPolicy::quote(amount, trust)
            .ok_or_else(|| LedgerError::InvalidInput("loan amount overflow".into()))?;

        // Commit
        let id = LoanId(self.loans.len() as u64 + 1);
        self.loans.push(Loan {
            id,
            borrower: borrower.clone(),
            principal: quote.principal,
            rate_percent: quote.rate_percent,
            interest: quote.interest,
            total_repayment: quote.total_repayment,
            purpose: purpose.to_string(),
            requested_at: now,
            approved_at: None,
            disbursed_at: None,
            due_at: None,
            repaid_at: None,
            defaulted_at: None,
            approved: false,
            disbursed: false,
            repaid: false,
            defaulted: false,
        });
        if let Some(member) = members.get_mut(borrower) {
            member.has_active_loan = true;
        }

        Ok(id)
    }

    /// Approve and disburse from the pool in one step. Returns the due date.
    pub fn approve(
        &mut self,
        members: &mut MemberLedger,
        pool: &mut LiquidityPool,
        loan_id: LoanId,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> LedgerResult<DateTime<Utc>> {
        let loan = self.require(loan_id)?;
        check_unapproved(loan)?;
        pool.ensure_covers(loan.principal)?;
        let pool_balance = pool.subtract(loan.principal)?;
        let borrowed = borrowed_after(members, &loan.borrower, loan.principal)?;
        let borrower = loan.borrower.clone();
        let due = now
            .checked_add_signed(duration)
            .ok_or_else(|| LedgerError::InvalidInput("due date out of range".into()))?;

        // Commit
        pool.set_balance(pool_balance);
        if let Some(member) = members.get_mut(&borrower) {
            member.total_borrowed = borrowed;
        }
        if let Some(loan) = self.get_mut(loan_id) {
            loan.approved = true;
            loan.disbursed = true;
            loan.approved_at = Some(now);
            loan.disbursed_at = Some(now);
            loan.due_at = Some(due);
        }

        Ok(due)
    }

    /// Approve without disbursing; funds arrive later through `disburse`.
    pub fn approve_deferred(&mut self, loan_id: LoanId, now: DateTime<Utc>) -> LedgerResult<()> {
        check_unapproved(self.require(loan_id)?)?;

        if let Some(loan) = self.get_mut(loan_id) {
            loan.approved = true;
            loan.approved_at = Some(now);
        }
        Ok(())
    }

    /// Disburse an approved loan funded by `payment`. Returns the due date.
    ///
    /// The payment is handed to the borrower directly; the pool is not drawn.
    pub fn disburse(
        &mut self,
        members: &mut MemberLedger,
        loan_id: LoanId,
        payment: Amount,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> LedgerResult<DateTime<Utc>> {
        let loan = self.require(loan_id)?;
        if !loan.approved {
            return Err(LedgerError::InvalidState(format!(
                "loan {} is not approved",
                loan_id
            )));
        }
        if loan.disbursed {
            return Err(LedgerError::InvalidState(format!(
                "loan {} is already disbursed",
                loan_id
            )));
        }
        if payment != loan.principal {
            return Err(LedgerError::PaymentMismatch {
                expected: loan.principal,
                actual: payment,
            });
        }
        let borrowed = borrowed_after(members, &loan.borrower, loan.principal)?;
        let borrower = loan.borrower.clone();
        let due = now
            .checked_add_signed(duration)
            .ok_or_else(|| LedgerError::InvalidInput("due date out of range".into()))?;

        // Commit
        if let Some(member) = members.get_mut(&borrower) {
            member.total_borrowed = borrowed;
        }
        if let Some(loan) = self.get_mut(loan_id) {
            loan.disbursed = true;
            loan.disbursed_at = Some(now);
            loan.due_at = Some(due);
        }

        Ok(due)
    }

    /// Settle a loan in full and award the timing bonus.
    pub fn repay(
        &mut self,
        members: &mut MemberLedger,
        pool: &mut LiquidityPool,
        caller: &MemberId,
        loan_id: LoanId,
        payment: Amount,
        now: DateTime<Utc>,
    ) -> LedgerResult<RepaymentOutcome> {
        let loan = self.require(loan_id)?;
        if &loan.borrower != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the borrower of loan {}",
                caller, loan_id
            )));
        }
        if loan.repaid {
            return Err(LedgerError::InvalidState(format!(
                "loan {} is already repaid",
                loan_id
            )));
        }
        if loan.defaulted {
            return Err(LedgerError::InvalidState(format!(
                "loan {} has defaulted",
                loan_id
            )));
        }
        let due = match (loan.disbursed, loan.due_at) {
            (true, Some(due)) => due,
            _ => {
                return Err(LedgerError::InvalidState(format!(
                    "loan {} is not disbursed",
                    loan_id
                )))
            }
        };
        if payment != loan.total_repayment {
            return Err(LedgerError::PaymentMismatch {
                expected: loan.total_repayment,
                actual: payment,
            });
        }

        let member = members.require(caller)?;
        let bonus = credit_bonus(due, now);
        let previous_score = member.score;
        let new_score = ScoreEngine::adjust(previous_score, bonus);
        let repaid = member
            .total_repaid
            .checked_add(&payment)
            .ok_or_else(|| LedgerError::InvalidInput("repaid total overflow".into()))?;
        let loans_completed = member.loans_completed + 1;
        let pool_balance = pool.add(payment)?;

        // Commit
        pool.set_balance(pool_balance);
        if let Some(member) = members.get_mut(caller) {
            member.score = new_score;
            member.total_repaid = repaid;
            member.loans_completed = loans_completed;
            member.has_active_loan = false;
        }
        if let Some(loan) = self.get_mut(loan_id) {
            loan.repaid = true;
            loan.repaid_at = Some(now);
        }

        Ok(RepaymentOutcome {
            bonus,
            previous_score,
            new_score,
            loans_completed,
        })
    }

    /// Guard for the default penalty. Returns the loan on success.
    pub fn check_default_eligible(
        &self,
        loan_id: LoanId,
        grace: Duration,
        now: DateTime<Utc>,
    ) -> LedgerResult<&Loan> {
        let loan = self.require(loan_id)?;
        if !loan.disbursed {
            return Err(LedgerError::InvalidState(format!(
                "loan {} is not disbursed",
                loan_id
            )));
        }
        if loan.repaid {
            return Err(LedgerError::InvalidState(format!(
                "loan {} is already repaid",
                loan_id
            )));
        }
        if loan.defaulted {
            return Err(LedgerError::InvalidState(format!(
                "default penalty already applied to loan {}",
                loan_id
            )));
        }
        match loan.default_eligible_after(grace) {
            Some(after) if now > after => Ok(loan),
            Some(after) => Err(LedgerError::NotDefaultEligible {
                loan: loan_id,
                eligible_after: after,
            }),
            None => Err(LedgerError::InvalidState(format!(
                "loan {} has no due date",
                loan_id
            ))),
        }
    }

    pub(crate) fn mark_defaulted(&mut self, loan_id: LoanId, now: DateTime<Utc>) {
        if let Some(loan) = self.get_mut(loan_id) {
            loan.defaulted = true;
            loan.defaulted_at = Some(now);
        }
    }
}

fn check_unapproved(loan: &Loan) -> LedgerResult<()> {
    if loan.approved || loan.disbursed {
        return Err(LedgerError::InvalidState(format!(
            "loan {} is already approved",
            loan.id
        )));
    }
    Ok(())
}

fn borrowed_after(
    members: &MemberLedger,
    borrower: &MemberId,
    principal: Amount,
) -> LedgerResult<Amount> {
    members
        .require(borrower)?
        .total_borrowed
        .checked_add(&principal)
        .ok_or_else(|| LedgerError::InvalidInput("borrowed total overflow".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_credit_bonus_tiers() {
        let d = due();
        assert_eq!(credit_bonus(d, d - Duration::days(1)), 15);
        assert_eq!(credit_bonus(d, d - Duration::seconds(1)), 15);
        assert_eq!(credit_bonus(d, d), 10);
        assert_eq!(credit_bonus(d, d + Duration::days(2)), 10);
        assert_eq!(credit_bonus(d, d + Duration::days(3)), 10);
        assert_eq!(credit_bonus(d, d + Duration::days(3) + Duration::seconds(1)), 5);
        assert_eq!(credit_bonus(d, d + Duration::days(5)), 5);
        assert_eq!(credit_bonus(d, d + Duration::days(7)), 5);
        assert_eq!(credit_bonus(d, d + Duration::days(10)), 0);
    }

    fn disbursed_loan() -> Loan {
        Loan {
            id: LoanId(1),
            borrower: MemberId::new("a").unwrap(),
            principal: Amount::units(10),
            rate_percent: 6,
            interest: Amount::ZERO,
            total_repayment: Amount::units(10),
            purpose: "seeds".into(),
            requested_at: due() - Duration::days(8),
            approved_at: Some(due() - Duration::days(7)),
            disbursed_at: Some(due() - Duration::days(7)),
            due_at: Some(due()),
            repaid_at: None,
            defaulted_at: None,
            approved: true,
            disbursed: true,
            repaid: false,
            defaulted: false,
        }
    }

    #[test]
    fn test_status_is_derived_from_clock() {
        let loan = disbursed_loan();
        assert_eq!(loan.status(due()), LoanStatus::Disbursed);
        assert_eq!(loan.status(due() + Duration::seconds(1)), LoanStatus::Overdue);

        let grace = Duration::days(14);
        assert!(!loan.is_default_eligible(due() + grace, grace));
        assert!(loan.is_default_eligible(due() + grace + Duration::seconds(1), grace));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(LoanStatus::Overdue.to_string(), "overdue");
        let mut loan = disbursed_loan();
        loan.defaulted = true;
        assert_eq!(loan.status(due() + Duration::days(30)), LoanStatus::Defaulted);
    }
}
