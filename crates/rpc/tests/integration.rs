//! Integration tests for the TrustCircle CLI context
//!
//! These drive the ledger through `AppContext`, so every command goes
//! through validation, the journal, and replay on restart.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::TempDir;
use trustcircle_core::{Amount, MemberId};
use trustcircle_events::{verify_chain, JournalReader};
use trustcircle_ledger::{CircleId, Command, ErrorKind, LedgerConfig, LedgerEvent, LoanId, LoanStatus};
use trustcircle_rpc::{AppContext, CommitError};

fn id(s: &str) -> MemberId {
    MemberId::new(s).unwrap()
}

fn units(n: u64) -> Amount {
    Amount::units(n)
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
}

/// Genesis, a funded pool, and an active three-member circle
async fn bootstrap(data: &TempDir) -> AppContext {
    let mut ctx = AppContext::new(data.path()).await.unwrap();
    assert!(!ctx.is_initialized());

    ctx.advance_to(start()).unwrap();
    ctx.init(id("admin"), LedgerConfig::default(), "genesis-1").unwrap();

    ctx.commit(&id("admin"), Command::DepositLiquidity { amount: units(1000) }, "dep-1")
        .await
        .unwrap();
    ctx.commit(
        &id("alice"),
        Command::CreateCircle {
            name: "Market Women".into(),
            bond: units(5),
        },
        "c-1",
    )
    .await
    .unwrap();
    for who in ["bob", "carol"] {
        ctx.commit(
            &id(who),
            Command::JoinCircle {
                circle_id: CircleId(1),
                bond: units(5),
            },
            "j",
        )
        .await
        .unwrap();
    }
    ctx
}

#[tokio::test]
async fn test_full_loan_cycle_through_journal() {
    let data = TempDir::new().unwrap();
    let mut ctx = bootstrap(&data).await;
    assert_eq!(ctx.last_sequence(), 5);

    let (_, event) = ctx
        .commit(
            &id("alice"),
            Command::RequestLoan {
                amount: units(10),
                purpose: "seed stock".into(),
            },
            "req-1",
        )
        .await
        .unwrap();
    assert!(matches!(
        event,
        LedgerEvent::LoanRequested { loan_id: LoanId(1), .. }
    ));

    ctx.commit(&id("admin"), Command::ApproveLoan { loan_id: LoanId(1) }, "ap-1")
        .await
        .unwrap();
    assert_eq!(ctx.ledger().unwrap().pool_balance().value(), dec!(990));

    ctx.advance_to(start() + Duration::days(2)).unwrap();
    let (record, event) = ctx
        .commit(
            &id("alice"),
            Command::RepayLoan {
                loan_id: LoanId(1),
                // 6% of 10 floors to zero interest
                payment: units(10),
            },
            "rep-1",
        )
        .await
        .unwrap();
    assert_eq!(record.sequence, 8);
    match event {
        LedgerEvent::LoanRepaid { bonus, new_score, .. } => {
            assert_eq!(bonus, 15);
            assert_eq!(new_score.value(), 65);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let ledger = ctx.ledger().unwrap();
    assert_eq!(ledger.pool_balance().value(), dec!(1000));
    assert_eq!(ledger.loan_status(LoanId(1)).unwrap(), LoanStatus::Repaid);
    assert_eq!(ctx.audit().unwrap(), 8);
}

#[tokio::test]
async fn test_replay_rebuilds_state_after_restart() {
    let data = TempDir::new().unwrap();
    {
        let mut ctx = bootstrap(&data).await;
        ctx.commit(
            &id("bob"),
            Command::RequestLoan {
                amount: units(10),
                purpose: "tools".into(),
            },
            "req",
        )
        .await
        .unwrap();
        ctx.commit(&id("admin"), Command::ApproveLoan { loan_id: LoanId(1) }, "ap")
            .await
            .unwrap();

        // Default: due at +7d, eligible strictly after +21d
        ctx.advance_to(start() + Duration::days(21) + Duration::seconds(1))
            .unwrap();
        ctx.commit(&id("admin"), Command::PenalizeDefault { loan_id: LoanId(1) }, "pen")
            .await
            .unwrap();
    }

    let ctx = AppContext::new(data.path()).await.unwrap();
    assert!(ctx.is_initialized());
    assert_eq!(ctx.last_sequence(), 8);

    let ledger = ctx.ledger().unwrap();
    let bob = ledger.member(&id("bob")).unwrap();
    assert_eq!(bob.score.value(), 0);
    assert!(!bob.active);
    assert_eq!(ledger.member(&id("alice")).unwrap().score.value(), 30);
    assert_eq!(ledger.member(&id("carol")).unwrap().score.value(), 30);
    assert_eq!(ledger.pool_balance().value(), dec!(990));
    assert_eq!(ledger.loan_status(LoanId(1)).unwrap(), LoanStatus::Defaulted);
}

#[tokio::test]
async fn test_rejected_command_is_not_journaled() {
    let data = TempDir::new().unwrap();
    let mut ctx = bootstrap(&data).await;
    let before = ctx.last_sequence();

    // Non-admin deposit
    let err = ctx
        .commit(&id("alice"), Command::DepositLiquidity { amount: units(5) }, "x")
        .await
        .unwrap_err();
    match err {
        CommitError::Ledger(e) => assert_eq!(e.kind(), ErrorKind::Authorization),
        other => panic!("unexpected error {other:?}"),
    }

    // Over the tier limit
    let err = ctx
        .commit(
            &id("alice"),
            Command::RequestLoan {
                amount: units(11),
                purpose: "too much".into(),
            },
            "y",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CommitError::Ledger(ref e) if e.kind() == ErrorKind::Validation));

    assert_eq!(ctx.last_sequence(), before);
    let records = JournalReader::from_directory(ctx.journal_path())
        .unwrap()
        .read_all()
        .unwrap();
    assert_eq!(records.len() as u64, before);
    assert!(verify_chain(&records).is_ok());
    assert_eq!(ctx.ledger().unwrap().pool_balance().value(), dec!(1000));
}

#[tokio::test]
async fn test_commit_requires_genesis() {
    let data = TempDir::new().unwrap();
    let mut ctx = AppContext::new(data.path()).await.unwrap();

    let err = ctx
        .commit(&id("admin"), Command::DepositLiquidity { amount: units(1) }, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, CommitError::NotInitialized));

    ctx.init(id("admin"), LedgerConfig::default(), "g").unwrap();
    let err = ctx
        .init(id("admin"), LedgerConfig::default(), "g2")
        .unwrap_err();
    assert!(matches!(err, CommitError::AlreadyInitialized(1)));
}

#[tokio::test]
async fn test_clock_cannot_move_before_journal() {
    let data = TempDir::new().unwrap();
    let mut ctx = bootstrap(&data).await;

    let err = ctx.advance_to(start() - Duration::hours(1)).unwrap_err();
    assert!(matches!(err, CommitError::ClockRegression { .. }));
    assert_eq!(ctx.now(), start());
}

#[tokio::test]
async fn test_queries_after_future_dated_journal() {
    let data = TempDir::new().unwrap();
    let future = start() + Duration::days(30);
    {
        let mut ctx = bootstrap(&data).await;
        ctx.advance_to(future).unwrap();
        ctx.commit(&id("admin"), Command::DepositLiquidity { amount: units(50) }, "dep-2")
            .await
            .unwrap();
    }

    let mut ctx = AppContext::new(data.path()).await.unwrap();

    // A read-only view at an earlier wall clock sits on the last record
    ctx.view_at(start());
    assert_eq!(ctx.now(), future);
    assert_eq!(ctx.ledger().unwrap().pool_balance().value(), dec!(1050));
    assert_eq!(ctx.audit().unwrap(), 6);

    ctx.view_at(future + Duration::hours(2));
    assert_eq!(ctx.now(), future + Duration::hours(2));

    // Writes still refuse to move before the journal
    let err = ctx.advance_to(start()).unwrap_err();
    assert!(matches!(err, CommitError::ClockRegression { last, .. } if last == future));
    assert_eq!(ctx.last_sequence(), 6);
}

#[tokio::test]
async fn test_tampered_journal_fails_to_open() {
    let data = TempDir::new().unwrap();
    let journal_path = {
        let ctx = bootstrap(&data).await;
        ctx.journal_path().to_path_buf()
    };

    let file = journal_path.join("2026-04-01.jsonl");
    let content = std::fs::read_to_string(&file).unwrap();
    std::fs::write(&file, content.replace("\"1000\"", "\"9000\"")).unwrap();

    assert!(AppContext::new(data.path()).await.is_err());
}

#[tokio::test]
async fn test_advise_profile_from_ledger() {
    let data = TempDir::new().unwrap();
    let ctx = bootstrap(&data).await;

    let input = trustcircle_advisor::AdvisoryInput::from_ledger(
        ctx.ledger().unwrap(),
        &id("alice"),
        200,
        true,
    )
    .unwrap();
    assert!(input.in_circle);
    assert_eq!(input.prior_loans, 0);

    // 15 + 5 + 10 + 10
    let profile = ctx.advisor().refresh(input).await.unwrap();
    assert_eq!(profile.report.total, 40);
    assert!(!profile.needs_manual_review);
    assert_eq!(profile.updated_at, start());
}
