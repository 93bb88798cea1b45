//! TrustCircle CLI - Main entry point

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use trustcircle_advisor::AdvisorConfig;
use trustcircle_core::MemberId;
use trustcircle_ledger::LedgerConfig;
use trustcircle_rpc::{commands, AppContext};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "trustcircle")]
#[command(about = "TrustCircle - Circle-backed micro-lending ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, global = true, default_value = "./data")]
    data: PathBuf,

    /// Ledger config file (JSON), used by `init`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Member issuing the command
    #[arg(long = "as", global = true)]
    caller: Option<String>,

    /// Ledger time for this invocation (RFC 3339); defaults to the wall clock
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Optional correlation ID
    #[arg(long, global = true)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger with a Genesis record
    Init {
        /// Admin member ID
        admin: String,
    },

    /// Create a circle with the caller as first member
    CreateCircle {
        name: String,
        /// Bond pledged by the creator
        bond: Decimal,
    },

    /// Join an existing circle
    JoinCircle {
        circle: u64,
        bond: Decimal,
    },

    /// Request a loan
    RequestLoan {
        amount: Decimal,
        purpose: String,
    },

    /// Approve a loan (admin)
    ApproveLoan {
        loan: u64,
        /// Approve without funding; the loan is funded by `disburse-loan`
        #[arg(long)]
        deferred: bool,
    },

    /// Fund an approved loan with an exact payment (admin)
    DisburseLoan {
        loan: u64,
        payment: Decimal,
    },

    /// Repay a loan in full
    RepayLoan {
        loan: u64,
        payment: Decimal,
    },

    /// Penalize a defaulted loan and cascade to the circle (admin)
    PenalizeDefault {
        loan: u64,
    },

    /// Deposit liquidity into the pool (admin)
    Deposit {
        amount: Decimal,
    },

    /// Withdraw liquidity from the pool (admin)
    Withdraw {
        amount: Decimal,
    },

    /// Reactivate a frozen member (admin)
    Unfreeze {
        member: String,
    },

    /// Hand the admin role to another member (admin)
    TransferAdmin {
        new_admin: String,
    },

    /// Override the loan term (admin)
    SetLoanDuration {
        /// Term in seconds
        secs: u64,
    },

    /// Show a member's scores and credit terms
    Member {
        member: String,
    },

    /// Show a circle
    Circle {
        circle: u64,
    },

    /// Show a loan
    Loan {
        loan: u64,
    },

    /// Show the liquidity pool
    Pool,

    /// Audit the journal (verify hash chain)
    Audit,

    /// Compute an advisory risk profile for a member
    Advise {
        member: String,
        /// Wallet age in days
        #[arg(long, default_value_t = 0)]
        wallet_age_days: u32,
        /// Member passed identity verification
        #[arg(long)]
        verified: bool,
        /// Advisor config file (JSON)
        #[arg(long)]
        advisor_config: Option<PathBuf>,
    },
}

impl Commands {
    /// Queries never append to the journal
    fn is_read_only(&self) -> bool {
        matches!(
            self,
            Commands::Member { .. }
                | Commands::Circle { .. }
                | Commands::Loan { .. }
                | Commands::Pool
                | Commands::Audit
                | Commands::Advise { .. }
        )
    }
}

fn caller(cli_caller: &Option<String>) -> anyhow::Result<MemberId> {
    match cli_caller {
        Some(raw) => Ok(MemberId::new(raw)?),
        None => anyhow::bail!("this command needs --as <member>"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut ctx = AppContext::new(&cli.data).await?;
    let at = cli.now.unwrap_or_else(Utc::now);
    if cli.command.is_read_only() {
        ctx.view_at(at);
    } else {
        ctx.advance_to(at)?;
    }

    let correlation_id = cli
        .correlation_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match cli.command {
        Commands::Init { admin } => {
            let config = match &cli.config {
                Some(path) => LedgerConfig::from_file(path)?,
                None => LedgerConfig::default(),
            };
            commands::init(&mut ctx, &admin, config, &correlation_id).await?;
        }

        Commands::CreateCircle { name, bond } => {
            let caller = caller(&cli.caller)?;
            commands::create_circle(&mut ctx, &caller, &name, bond, &correlation_id).await?;
        }

        Commands::JoinCircle { circle, bond } => {
            let caller = caller(&cli.caller)?;
            commands::join_circle(&mut ctx, &caller, circle, bond, &correlation_id).await?;
        }

        Commands::RequestLoan { amount, purpose } => {
            let caller = caller(&cli.caller)?;
            commands::request_loan(&mut ctx, &caller, amount, &purpose, &correlation_id).await?;
        }

        Commands::ApproveLoan { loan, deferred } => {
            let caller = caller(&cli.caller)?;
            commands::approve_loan(&mut ctx, &caller, loan, deferred, &correlation_id).await?;
        }

        Commands::DisburseLoan { loan, payment } => {
            let caller = caller(&cli.caller)?;
            commands::disburse_loan(&mut ctx, &caller, loan, payment, &correlation_id).await?;
        }

        Commands::RepayLoan { loan, payment } => {
            let caller = caller(&cli.caller)?;
            commands::repay_loan(&mut ctx, &caller, loan, payment, &correlation_id).await?;
        }

        Commands::PenalizeDefault { loan } => {
            let caller = caller(&cli.caller)?;
            commands::penalize_default(&mut ctx, &caller, loan, &correlation_id).await?;
        }

        Commands::Deposit { amount } => {
            let caller = caller(&cli.caller)?;
            commands::deposit(&mut ctx, &caller, amount, &correlation_id).await?;
        }

        Commands::Withdraw { amount } => {
            let caller = caller(&cli.caller)?;
            commands::withdraw(&mut ctx, &caller, amount, &correlation_id).await?;
        }

        Commands::Unfreeze { member } => {
            let caller = caller(&cli.caller)?;
            commands::unfreeze(&mut ctx, &caller, &member, &correlation_id).await?;
        }

        Commands::TransferAdmin { new_admin } => {
            let caller = caller(&cli.caller)?;
            commands::transfer_admin(&mut ctx, &caller, &new_admin, &correlation_id).await?;
        }

        Commands::SetLoanDuration { secs } => {
            let caller = caller(&cli.caller)?;
            commands::set_loan_duration(&mut ctx, &caller, secs, &correlation_id).await?;
        }

        Commands::Member { member } => {
            commands::member_info(&ctx, &member).await?;
        }

        Commands::Circle { circle } => {
            commands::circle_info(&ctx, circle).await?;
        }

        Commands::Loan { loan } => {
            commands::loan_info(&ctx, loan).await?;
        }

        Commands::Pool => {
            commands::pool_info(&ctx).await?;
        }

        Commands::Audit => {
            commands::audit(&ctx).await?;
        }

        Commands::Advise {
            member,
            wallet_age_days,
            verified,
            advisor_config,
        } => {
            if let Some(path) = advisor_config {
                ctx = ctx.with_advisor_config(AdvisorConfig::from_file(&path)?);
            }
            commands::advise(&ctx, &member, wallet_age_days, verified).await?;
        }
    }

    Ok(())
}
