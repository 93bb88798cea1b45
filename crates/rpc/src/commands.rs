//! CLI commands

use rust_decimal::Decimal;
use trustcircle_advisor::AdvisoryInput;
use trustcircle_core::{Amount, MemberId};
use trustcircle_ledger::{CircleId, Command, LedgerConfig, LedgerEvent, LoanId};
use trustcircle_scoring::CreditTier;

use crate::context::AppContext;

/// Initialize the ledger with a Genesis record
pub async fn init(
    ctx: &mut AppContext,
    admin: &str,
    config: LedgerConfig,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    if ctx.is_initialized() {
        anyhow::bail!("Ledger already initialized (sequence = {})", ctx.last_sequence());
    }

    let admin = MemberId::new(admin)?;
    let record = ctx.init(admin.clone(), config, correlation_id)?;

    println!("✅ Ledger initialized, admin = {} (seq: {})", admin, record.sequence);
    Ok(())
}

/// Commit a command and print what it did
pub async fn submit(
    ctx: &mut AppContext,
    caller: &MemberId,
    command: Command,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let (record, event) = ctx.commit(caller, command, correlation_id).await?;
    println!("✅ {} (seq: {})", describe(&event), record.sequence);
    Ok(event)
}

pub async fn create_circle(
    ctx: &mut AppContext,
    caller: &MemberId,
    name: &str,
    bond: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::CreateCircle {
        name: name.to_string(),
        bond: Amount::new(bond)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn join_circle(
    ctx: &mut AppContext,
    caller: &MemberId,
    circle: u64,
    bond: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::JoinCircle {
        circle_id: CircleId(circle),
        bond: Amount::new(bond)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn request_loan(
    ctx: &mut AppContext,
    caller: &MemberId,
    amount: Decimal,
    purpose: &str,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::RequestLoan {
        amount: Amount::new(amount)?,
        purpose: purpose.to_string(),
    };
    submit(ctx, caller, command, correlation_id).await
}

/// Approve a loan; `deferred` leaves funding to a later disbursement
pub async fn approve_loan(
    ctx: &mut AppContext,
    caller: &MemberId,
    loan: u64,
    deferred: bool,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let loan_id = LoanId(loan);
    let command = if deferred {
        Command::ApproveLoanDeferred { loan_id }
    } else {
        Command::ApproveLoan { loan_id }
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn disburse_loan(
    ctx: &mut AppContext,
    caller: &MemberId,
    loan: u64,
    payment: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::DisburseLoan {
        loan_id: LoanId(loan),
        payment: Amount::new(payment)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn repay_loan(
    ctx: &mut AppContext,
    caller: &MemberId,
    loan: u64,
    payment: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::RepayLoan {
        loan_id: LoanId(loan),
        payment: Amount::new(payment)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn penalize_default(
    ctx: &mut AppContext,
    caller: &MemberId,
    loan: u64,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::PenalizeDefault {
        loan_id: LoanId(loan),
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn deposit(
    ctx: &mut AppContext,
    caller: &MemberId,
    amount: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::DepositLiquidity {
        amount: Amount::new(amount)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn withdraw(
    ctx: &mut AppContext,
    caller: &MemberId,
    amount: Decimal,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::WithdrawLiquidity {
        amount: Amount::new(amount)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn unfreeze(
    ctx: &mut AppContext,
    caller: &MemberId,
    member: &str,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::UnfreezeAccount {
        member: MemberId::new(member)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn transfer_admin(
    ctx: &mut AppContext,
    caller: &MemberId,
    new_admin: &str,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::TransferAdmin {
        new_admin: MemberId::new(new_admin)?,
    };
    submit(ctx, caller, command, correlation_id).await
}

pub async fn set_loan_duration(
    ctx: &mut AppContext,
    caller: &MemberId,
    duration_secs: u64,
    correlation_id: &str,
) -> Result<LedgerEvent, anyhow::Error> {
    let command = Command::SetLoanDuration { duration_secs };
    submit(ctx, caller, command, correlation_id).await
}

/// Show a member's scores and credit terms
pub async fn member_info(ctx: &AppContext, member: &str) -> Result<(), anyhow::Error> {
    let ledger = ctx.ledger()?;
    let id = MemberId::new(member)?;
    let Some(record) = ledger.member(&id) else {
        anyhow::bail!("Member not found: {}", id);
    };

    let trust = ledger.trust_score(&id)?;
    let tier = CreditTier::for_score(trust);

    println!("Member {}", id);
    match record.circle {
        Some(circle) => println!("  Circle:           {}", circle),
        None => println!("  Circle:           -"),
    }
    println!("  Individual score: {}", record.score);
    println!("  Trust score:      {} ({})", trust, tier);
    println!("  Max loan:         {}", ledger.max_loan_amount(&id)?);
    println!("  Interest rate:    {}%", ledger.interest_rate(&id)?);
    println!("  Loans completed:  {}", record.loans_completed);
    println!("  Borrowed/Repaid:  {} / {}", record.total_borrowed, record.total_repaid);
    println!(
        "  Status:           {}",
        if record.active { "active" } else { "frozen" }
    );
    Ok(())
}

pub async fn circle_info(ctx: &AppContext, circle: u64) -> Result<(), anyhow::Error> {
    let ledger = ctx.ledger()?;
    let circle_id = CircleId(circle);
    let Some(record) = ledger.circle(circle_id) else {
        anyhow::bail!("Circle not found: {}", circle_id);
    };

    println!("Circle {} \"{}\"", record.id, record.name);
    println!("  Active:        {}", record.active);
    println!("  Total stake:   {}", record.total_stake);
    println!("  Average score: {}", ledger.circle_average_score(circle_id)?);
    println!("  Members ({}):", record.member_count());
    for member in &record.members {
        if let Some(m) = ledger.member(member) {
            println!("    {:<20} {:>3}", m.id, m.score);
        }
    }
    Ok(())
}

pub async fn loan_info(ctx: &AppContext, loan: u64) -> Result<(), anyhow::Error> {
    let ledger = ctx.ledger()?;
    let loan_id = LoanId(loan);
    let Some(record) = ledger.loan(loan_id) else {
        anyhow::bail!("Loan not found: {}", loan_id);
    };

    println!("Loan {} for {}", record.id, record.borrower);
    println!("  Purpose:   {}", record.purpose);
    println!(
        "  Principal: {} at {}% (repay {})",
        record.principal, record.rate_percent, record.total_repayment
    );
    println!("  Status:    {}", ledger.loan_status(loan_id)?);
    if let Some(due) = record.due_at {
        println!("  Due:       {}", due.to_rfc3339());
    }
    println!("  Overdue:   {}", ledger.is_loan_overdue(loan_id)?);
    println!("  Defaultable: {}", ledger.is_default_eligible(loan_id)?);
    Ok(())
}

pub async fn pool_info(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let pool = ctx.ledger()?.pool();

    println!("Liquidity pool");
    println!("  Balance:   {}", pool.balance());
    println!("  Deposited: {}", pool.total_deposited());
    println!("  Withdrawn: {}", pool.total_withdrawn());
    Ok(())
}

/// Verify the journal hash chain
pub async fn audit(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let count = ctx.audit()?;
    println!("✅ Hash chain verified ({} records)", count);
    Ok(())
}

/// Refresh and print a member's advisory profile
pub async fn advise(
    ctx: &AppContext,
    member: &str,
    wallet_age_days: u32,
    verified: bool,
) -> Result<(), anyhow::Error> {
    let id = MemberId::new(member)?;
    let input = AdvisoryInput::from_ledger(ctx.ledger()?, &id, wallet_age_days, verified)?;
    let profile = ctx.advisor().refresh(input).await?;

    println!(
        "Advisory score for {}: {}/60 ({} risk)",
        profile.member, profile.report.total, profile.report.tier
    );
    println!("  {}", profile.report.rationale);
    if profile.needs_manual_review {
        println!("⚠️  Flagged for manual review");
    }
    Ok(())
}

fn describe(event: &LedgerEvent) -> String {
    match event {
        LedgerEvent::CircleCreated {
            circle_id,
            creator,
            name,
            bond,
        } => format!("Circle {} \"{}\" created by {} (bond {})", circle_id, name, creator, bond),
        LedgerEvent::MemberJoined {
            circle_id,
            member,
            member_count,
            activated,
            ..
        } => {
            let suffix = if *activated { ", circle activated" } else { "" };
            format!(
                "{} joined circle {} ({} members{})",
                member, circle_id, member_count, suffix
            )
        }
        LedgerEvent::LoanRequested {
            loan_id,
            borrower,
            principal,
            total_repayment,
            ..
        } => format!(
            "Loan {} requested by {}: {} (repay {})",
            loan_id, borrower, principal, total_repayment
        ),
        LedgerEvent::LoanApproved { loan_id, due_at } => match due_at {
            Some(due) => format!("Loan {} approved and funded, due {}", loan_id, due.to_rfc3339()),
            None => format!("Loan {} approved, awaiting disbursement", loan_id),
        },
        LedgerEvent::LoanDisbursed { loan_id, due_at } => {
            format!("Loan {} disbursed, due {}", loan_id, due_at.to_rfc3339())
        }
        LedgerEvent::LoanRepaid {
            loan_id,
            borrower,
            bonus,
            new_score,
        } => format!(
            "Loan {} repaid by {} (+{}, score {})",
            loan_id, borrower, bonus, new_score
        ),
        LedgerEvent::DefaultPenalized {
            loan_id,
            defaulter,
            new_score,
            peers,
        } => format!(
            "Loan {} defaulted: {} frozen at score {}, {} peers penalized",
            loan_id,
            defaulter,
            new_score,
            peers.len()
        ),
        LedgerEvent::LiquidityDeposited { amount, balance } => {
            format!("Deposited {} (pool {})", amount, balance)
        }
        LedgerEvent::LiquidityWithdrawn { amount, balance } => {
            format!("Withdrew {} (pool {})", amount, balance)
        }
        LedgerEvent::AccountUnfrozen { member } => format!("{} unfrozen", member),
        LedgerEvent::AdminTransferred {
            previous,
            new_admin,
        } => format!("Admin transferred from {} to {}", previous, new_admin),
        LedgerEvent::LoanDurationChanged { duration_secs } => {
            format!("Loan duration set to {}s", duration_secs)
        }
    }
}
