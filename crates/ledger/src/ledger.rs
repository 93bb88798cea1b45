//! TrustLedger - single-writer facade over all stores
//!
//! Every mutating method takes `&mut self`, so the borrow checker is the
//! exclusive lock: no two operations can interleave their effects. Each
//! method runs all of its guards before the first write.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trustcircle_core::{Amount, Clock, MemberId, Score};
use trustcircle_scoring::CreditPolicy;

use crate::admin::{AdminCap, AdminRole};
use crate::circle::{Circle, CircleId, CircleRegistry, JoinOutcome};
use crate::command::{Command, LedgerEvent};
use crate::config::{LedgerConfig, MAX_TERM_DAYS};
use crate::default::{DefaultHandler, DefaultOutcome};
use crate::error::{LedgerError, LedgerResult};
use crate::loan::{Loan, LoanId, LoanLedger, LoanStatus, RepaymentOutcome};
use crate::member::{Member, MemberLedger};
use crate::pool::LiquidityPool;

/// Cloning shares the clock handle; callers stage a command on a clone and
/// keep it only once the command is durably recorded.
#[derive(Clone)]
pub struct TrustLedger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    admin: AdminRole,
    loan_duration: Duration,
    circles: CircleRegistry,
    members: MemberLedger,
    loans: LoanLedger,
    pool: LiquidityPool,
}

impl TrustLedger {
    pub fn new(config: LedgerConfig, admin: MemberId, clock: Arc<dyn Clock>) -> Self {
        let loan_duration = config.loan_duration();
        Self {
            config,
            clock,
            admin: AdminRole::new(admin),
            loan_duration,
            circles: CircleRegistry::new(),
            members: MemberLedger::new(),
            loans: LoanLedger::new(),
            pool: LiquidityPool::new(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // === Admin capability ===

    /// Mint an admin capability for `caller`, if `caller` is the admin
    pub fn authorize_admin(&self, caller: &MemberId) -> LedgerResult<AdminCap> {
        self.admin.authorize(caller)
    }

    // === Circles ===

    pub fn create_circle(
        &mut self,
        creator: &MemberId,
        name: &str,
        bond: Amount,
    ) -> LedgerResult<CircleId> {
        let now = self.now();
        let id = self
            .circles
            .create(&mut self.members, &self.config, creator, name, bond, now)
            .inspect_err(|e| debug!(%creator, error = %e, "create_circle rejected"))?;
        info!(circle = %id, %creator, %bond, "circle created");
        Ok(id)
    }

    pub fn join_circle(
        &mut self,
        member: &MemberId,
        circle_id: CircleId,
        bond: Amount,
    ) -> LedgerResult<JoinOutcome> {
        let now = self.now();
        let outcome = self
            .circles
            .join(&mut self.members, &self.config, member, circle_id, bond, now)
            .inspect_err(|e| debug!(%member, circle = %circle_id, error = %e, "join_circle rejected"))?;
        info!(circle = %circle_id, %member, count = outcome.member_count, "member joined");
        if outcome.activated {
            info!(circle = %circle_id, "circle activated");
        }
        Ok(outcome)
    }

    // === Loans ===

    pub fn request_loan(
        &mut self,
        borrower: &MemberId,
        amount: Amount,
        purpose: &str,
    ) -> LedgerResult<LoanId> {
        let now = self.now();
        let id = self
            .loans
            .request(&mut self.members, &self.circles, borrower, amount, purpose, now)
            .inspect_err(|e| debug!(%borrower, %amount, error = %e, "request_loan rejected"))?;
        info!(loan = %id, %borrower, %amount, "loan requested");
        Ok(id)
    }

    /// Approve and disburse from the pool. Returns the due date.
    pub fn approve_loan(&mut self, cap: &AdminCap, loan_id: LoanId) -> LedgerResult<DateTime<Utc>> {
        self.admin.verify(cap)?;
        let now = self.now();
        let due = self
            .loans
            .approve(&mut self.members, &mut self.pool, loan_id, self.loan_duration, now)
            .inspect_err(|e| debug!(loan = %loan_id, error = %e, "approve_loan rejected"))?;
        info!(loan = %loan_id, %due, pool = %self.pool.balance(), "loan approved and disbursed");
        Ok(due)
    }

    pub fn approve_loan_deferred(&mut self, cap: &AdminCap, loan_id: LoanId) -> LedgerResult<()> {
        self.admin.verify(cap)?;
        let now = self.now();
        self.loans
            .approve_deferred(loan_id, now)
            .inspect_err(|e| debug!(loan = %loan_id, error = %e, "deferred approval rejected"))?;
        info!(loan = %loan_id, "loan approved, awaiting disbursement");
        Ok(())
    }

    /// Disburse a deferred-approved loan with an exact principal payment.
    pub fn disburse_loan(
        &mut self,
        cap: &AdminCap,
        loan_id: LoanId,
        payment: Amount,
    ) -> LedgerResult<DateTime<Utc>> {
        self.admin.verify(cap)?;
        let now = self.now();
        let due = self
            .loans
            .disburse(&mut self.members, loan_id, payment, self.loan_duration, now)
            .inspect_err(|e| debug!(loan = %loan_id, error = %e, "disburse_loan rejected"))?;
        info!(loan = %loan_id, %due, "loan disbursed");
        Ok(due)
    }

    pub fn repay_loan(
        &mut self,
        borrower: &MemberId,
        loan_id: LoanId,
        payment: Amount,
    ) -> LedgerResult<RepaymentOutcome> {
        let now = self.now();
        let outcome = self
            .loans
            .repay(&mut self.members, &mut self.pool, borrower, loan_id, payment, now)
            .inspect_err(|e| debug!(loan = %loan_id, %borrower, error = %e, "repay_loan rejected"))?;
        info!(
            loan = %loan_id,
            %borrower,
            bonus = outcome.bonus,
            score = %outcome.new_score,
            "loan repaid"
        );
        Ok(outcome)
    }

    pub fn penalize_default(&mut self, cap: &AdminCap, loan_id: LoanId) -> LedgerResult<DefaultOutcome> {
        self.admin.verify(cap)?;
        let now = self.now();
        let grace = self.config.default_grace();
        let outcome = DefaultHandler::penalize(
            &mut self.loans,
            &mut self.members,
            &self.circles,
            loan_id,
            grace,
            now,
        )
        .inspect_err(|e| debug!(loan = %loan_id, error = %e, "penalize_default rejected"))?;
        warn!(
            loan = %loan_id,
            defaulter = %outcome.defaulter,
            score = %outcome.new_score,
            peers = outcome.peers.len(),
            "loan defaulted, account frozen"
        );
        Ok(outcome)
    }

    // === Pool ===

    pub fn deposit_liquidity(&mut self, cap: &AdminCap, amount: Amount) -> LedgerResult<Amount> {
        self.admin.verify(cap)?;
        let balance = self
            .pool
            .deposit(amount)
            .inspect_err(|e| debug!(%amount, error = %e, "deposit rejected"))?;
        info!(%amount, %balance, "liquidity deposited");
        Ok(balance)
    }

    pub fn withdraw_liquidity(&mut self, cap: &AdminCap, amount: Amount) -> LedgerResult<Amount> {
        self.admin.verify(cap)?;
        let balance = self
            .pool
            .withdraw(amount)
            .inspect_err(|e| debug!(%amount, error = %e, "withdraw rejected"))?;
        info!(%amount, %balance, "liquidity withdrawn");
        Ok(balance)
    }

    // === Admin ===

    pub fn unfreeze_account(&mut self, cap: &AdminCap, member: &MemberId) -> LedgerResult<()> {
        self.admin.verify(cap)?;
        let record = self
            .members
            .get_mut(member)
            .ok_or_else(|| LedgerError::MemberNotFound(member.clone()))?;
        record.active = true;
        info!(%member, "account unfrozen");
        Ok(())
    }

    /// Hand the admin role over. Returns the previous admin.
    pub fn transfer_admin(&mut self, cap: &AdminCap, new_admin: MemberId) -> LedgerResult<MemberId> {
        self.admin.verify(cap)?;
        let previous = self.admin.transfer(new_admin);
        info!(%previous, new_admin = %self.admin.admin(), "admin transferred");
        Ok(previous)
    }

    /// Override the loan term for loans disbursed from now on.
    pub fn set_loan_duration(&mut self, cap: &AdminCap, duration: Duration) -> LedgerResult<()> {
        self.admin.verify(cap)?;
        if duration <= Duration::zero() || duration > Duration::days(MAX_TERM_DAYS) {
            return Err(LedgerError::InvalidInput(format!(
                "loan duration must be within 1..={} days",
                MAX_TERM_DAYS
            )));
        }
        self.loan_duration = duration;
        info!(secs = duration.num_seconds(), "loan duration changed");
        Ok(())
    }

    // === Command dispatch ===

    /// Run a serialized command on behalf of `caller`.
    ///
    /// Admin commands authorize `caller` first.
    pub fn execute(&mut self, caller: &MemberId, command: &Command) -> LedgerResult<LedgerEvent> {
        let cap = if command.requires_admin() {
            Some(self.authorize_admin(caller)?)
        } else {
            None
        };
        let cap = cap.as_ref();
        let admin = || cap.ok_or_else(|| LedgerError::Unauthorized("admin required".into()));

        let event = match command {
            Command::CreateCircle { name, bond } => {
                let circle_id = self.create_circle(caller, name, *bond)?;
                LedgerEvent::CircleCreated {
                    circle_id,
                    creator: caller.clone(),
                    name: name.trim().to_string(),
                    bond: *bond,
                }
            }
            Command::JoinCircle { circle_id, bond } => {
                let outcome = self.join_circle(caller, *circle_id, *bond)?;
                LedgerEvent::MemberJoined {
                    circle_id: *circle_id,
                    member: caller.clone(),
                    bond: *bond,
                    member_count: outcome.member_count,
                    activated: outcome.activated,
                }
            }
            Command::RequestLoan { amount, purpose } => {
                let loan_id = self.request_loan(caller, *amount, purpose)?;
                let loan = self.loans.require(loan_id)?;
                LedgerEvent::LoanRequested {
                    loan_id,
                    borrower: caller.clone(),
                    principal: loan.principal,
                    interest: loan.interest,
                    total_repayment: loan.total_repayment,
                }
            }
            Command::ApproveLoan { loan_id } => {
                let due = self.approve_loan(admin()?, *loan_id)?;
                LedgerEvent::LoanApproved {
                    loan_id: *loan_id,
                    due_at: Some(due),
                }
            }
            Command::ApproveLoanDeferred { loan_id } => {
                self.approve_loan_deferred(admin()?, *loan_id)?;
                LedgerEvent::LoanApproved {
                    loan_id: *loan_id,
                    due_at: None,
                }
            }
            Command::DisburseLoan { loan_id, payment } => {
                let due_at = self.disburse_loan(admin()?, *loan_id, *payment)?;
                LedgerEvent::LoanDisbursed {
                    loan_id: *loan_id,
                    due_at,
                }
            }
            Command::RepayLoan { loan_id, payment } => {
                let outcome = self.repay_loan(caller, *loan_id, *payment)?;
                LedgerEvent::LoanRepaid {
                    loan_id: *loan_id,
                    borrower: caller.clone(),
                    bonus: outcome.bonus,
                    new_score: outcome.new_score,
                }
            }
            Command::PenalizeDefault { loan_id } => {
                let outcome = self.penalize_default(admin()?, *loan_id)?;
                LedgerEvent::DefaultPenalized {
                    loan_id: *loan_id,
                    defaulter: outcome.defaulter,
                    new_score: outcome.new_score,
                    peers: outcome.peers,
                }
            }
            Command::DepositLiquidity { amount } => {
                let balance = self.deposit_liquidity(admin()?, *amount)?;
                LedgerEvent::LiquidityDeposited {
                    amount: *amount,
                    balance,
                }
            }
            Command::WithdrawLiquidity { amount } => {
                let balance = self.withdraw_liquidity(admin()?, *amount)?;
                LedgerEvent::LiquidityWithdrawn {
                    amount: *amount,
                    balance,
                }
            }
            Command::UnfreezeAccount { member } => {
                self.unfreeze_account(admin()?, member)?;
                LedgerEvent::AccountUnfrozen {
                    member: member.clone(),
                }
            }
            Command::TransferAdmin { new_admin } => {
                let previous = self.transfer_admin(admin()?, new_admin.clone())?;
                LedgerEvent::AdminTransferred {
                    previous,
                    new_admin: new_admin.clone(),
                }
            }
            Command::SetLoanDuration { duration_secs } => {
                let duration = i64::try_from(*duration_secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| LedgerError::InvalidInput("loan duration too large".into()))?;
                self.set_loan_duration(admin()?, duration)?;
                LedgerEvent::LoanDurationChanged {
                    duration_secs: *duration_secs,
                }
            }
        };
        Ok(event)
    }

    // === Queries ===

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn admin(&self) -> &MemberId {
        self.admin.admin()
    }

    pub fn loan_duration(&self) -> Duration {
        self.loan_duration
    }

    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    pub fn pool_balance(&self) -> Amount {
        self.pool.balance()
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn members(&self) -> &MemberLedger {
        &self.members
    }

    pub fn circle(&self, id: CircleId) -> Option<&Circle> {
        self.circles.get(id)
    }

    pub fn circles(&self) -> &CircleRegistry {
        &self.circles
    }

    pub fn loan(&self, id: LoanId) -> Option<&Loan> {
        self.loans.get(id)
    }

    pub fn loans(&self) -> &LoanLedger {
        &self.loans
    }

    pub fn loans_of<'a>(&'a self, borrower: &'a MemberId) -> impl Iterator<Item = &'a Loan> {
        self.loans.loans_of(borrower)
    }

    pub fn trust_score(&self, member: &MemberId) -> LedgerResult<Score> {
        self.members.trust_score(&self.circles, member)
    }

    pub fn max_loan_amount(&self, member: &MemberId) -> LedgerResult<Amount> {
        Ok(CreditPolicy::max_loan(self.trust_score(member)?))
    }

    pub fn interest_rate(&self, member: &MemberId) -> LedgerResult<u32> {
        Ok(CreditPolicy::interest_rate(self.trust_score(member)?))
    }

    pub fn circle_average_score(&self, circle_id: CircleId) -> LedgerResult<Score> {
        let circle = self
            .circles
            .get(circle_id)
            .ok_or(LedgerError::CircleNotFound(circle_id))?;
        Ok(self.members.circle_average(circle))
    }

    pub fn loan_status(&self, loan_id: LoanId) -> LedgerResult<LoanStatus> {
        Ok(self.loans.require(loan_id)?.status(self.now()))
    }

    pub fn is_loan_overdue(&self, loan_id: LoanId) -> LedgerResult<bool> {
        Ok(self.loans.require(loan_id)?.is_overdue(self.now()))
    }

    pub fn is_default_eligible(&self, loan_id: LoanId) -> LedgerResult<bool> {
        Ok(self
            .loans
            .require(loan_id)?
            .is_default_eligible(self.now(), self.config.default_grace()))
    }
}
