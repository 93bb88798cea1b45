//! Commands and events
//!
//! `Command` is the serializable form of every mutating operation; the
//! journal stores commands and replays them. `LedgerEvent` describes what a
//! committed command actually did.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trustcircle_core::{Amount, MemberId, Score};

use crate::circle::CircleId;
use crate::default::PeerPenalty;
use crate::loan::LoanId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateCircle { name: String, bond: Amount },
    JoinCircle { circle_id: CircleId, bond: Amount },
    RequestLoan { amount: Amount, purpose: String },
    ApproveLoan { loan_id: LoanId },
    ApproveLoanDeferred { loan_id: LoanId },
    DisburseLoan { loan_id: LoanId, payment: Amount },
    RepayLoan { loan_id: LoanId, payment: Amount },
    PenalizeDefault { loan_id: LoanId },
    DepositLiquidity { amount: Amount },
    WithdrawLiquidity { amount: Amount },
    UnfreezeAccount { member: MemberId },
    TransferAdmin { new_admin: MemberId },
    SetLoanDuration { duration_secs: u64 },
}

impl Command {
    /// Short operation name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateCircle { .. } => "create_circle",
            Command::JoinCircle { .. } => "join_circle",
            Command::RequestLoan { .. } => "request_loan",
            Command::ApproveLoan { .. } => "approve_loan",
            Command::ApproveLoanDeferred { .. } => "approve_loan_deferred",
            Command::DisburseLoan { .. } => "disburse_loan",
            Command::RepayLoan { .. } => "repay_loan",
            Command::PenalizeDefault { .. } => "penalize_default",
            Command::DepositLiquidity { .. } => "deposit_liquidity",
            Command::WithdrawLiquidity { .. } => "withdraw_liquidity",
            Command::UnfreezeAccount { .. } => "unfreeze_account",
            Command::TransferAdmin { .. } => "transfer_admin",
            Command::SetLoanDuration { .. } => "set_loan_duration",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::ApproveLoan { .. }
                | Command::ApproveLoanDeferred { .. }
                | Command::DisburseLoan { .. }
                | Command::PenalizeDefault { .. }
                | Command::DepositLiquidity { .. }
                | Command::WithdrawLiquidity { .. }
                | Command::UnfreezeAccount { .. }
                | Command::TransferAdmin { .. }
                | Command::SetLoanDuration { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    CircleCreated {
        circle_id: CircleId,
        creator: MemberId,
        name: String,
        bond: Amount,
    },
    MemberJoined {
        circle_id: CircleId,
        member: MemberId,
        bond: Amount,
        member_count: usize,
        activated: bool,
    },
    LoanRequested {
        loan_id: LoanId,
        borrower: MemberId,
        principal: Amount,
        interest: Amount,
        total_repayment: Amount,
    },
    LoanApproved {
        loan_id: LoanId,
        /// `None` for a deferred approval
        due_at: Option<DateTime<Utc>>,
    },
    LoanDisbursed {
        loan_id: LoanId,
        due_at: DateTime<Utc>,
    },
    LoanRepaid {
        loan_id: LoanId,
        borrower: MemberId,
        bonus: i32,
        new_score: Score,
    },
    DefaultPenalized {
        loan_id: LoanId,
        defaulter: MemberId,
        new_score: Score,
        peers: Vec<PeerPenalty>,
    },
    LiquidityDeposited {
        amount: Amount,
        balance: Amount,
    },
    LiquidityWithdrawn {
        amount: Amount,
        balance: Amount,
    },
    AccountUnfrozen {
        member: MemberId,
    },
    AdminTransferred {
        previous: MemberId,
        new_admin: MemberId,
    },
    LoanDurationChanged {
        duration_secs: u64,
    },
}
