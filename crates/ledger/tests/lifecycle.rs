//! Integration tests for the loan lifecycle
//!
//! These drive `TrustLedger` through complete scenarios with a manual clock:
//! circle formation, pricing, approval paths, repayment tiers and defaults.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use trustcircle_core::{Amount, Clock, ManualClock, MemberId, Score};
use trustcircle_ledger::{
    CircleId, Command, ErrorKind, LedgerConfig, LedgerError, LedgerEvent, LoanId, LoanStatus,
    TrustLedger,
};

fn id(s: &str) -> MemberId {
    MemberId::new(s).unwrap()
}

struct Harness {
    ledger: TrustLedger,
    clock: Arc<ManualClock>,
    circle: CircleId,
}

/// Admin "admin", active circle of alice/bob/carol, pool funded with 1000
fn harness() -> Harness {
    let start = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let mut ledger = TrustLedger::new(LedgerConfig::default(), id("admin"), clock.clone());

    let circle = ledger
        .create_circle(&id("alice"), "Harvest Circle", Amount::units(1))
        .unwrap();
    ledger.join_circle(&id("bob"), circle, Amount::units(1)).unwrap();
    let outcome = ledger.join_circle(&id("carol"), circle, Amount::units(1)).unwrap();
    assert!(outcome.activated);

    let cap = ledger.authorize_admin(&id("admin")).unwrap();
    ledger.deposit_liquidity(&cap, Amount::units(1000)).unwrap();

    Harness {
        ledger,
        clock,
        circle,
    }
}

/// Raise a member's score through early repayments of 1-unit loans
fn set_score(h: &mut Harness, who: &str, score: u32) {
    let target = Score::new(score).unwrap();
    let member = id(who);
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    while h.ledger.member(&member).unwrap().score < target {
        let loan = h
            .ledger
            .request_loan(&member, Amount::units(1), "top-up")
            .unwrap();
        h.ledger.approve_loan(&cap, loan).unwrap();
        let total = h.ledger.loan(loan).unwrap().total_repayment;
        h.ledger.repay_loan(&member, loan, total).unwrap();
    }
}

#[test]
fn test_end_to_end_early_repayment() {
    let mut h = harness();
    let alice = id("alice");

    assert_eq!(h.ledger.trust_score(&alice).unwrap().value(), 50);
    assert_eq!(h.ledger.max_loan_amount(&alice).unwrap(), Amount::units(10));
    assert_eq!(h.ledger.interest_rate(&alice).unwrap(), 6);

    let loan_id = h.ledger.request_loan(&alice, Amount::units(10), "seed stock").unwrap();
    let loan = h.ledger.loan(loan_id).unwrap();
    assert_eq!(loan.interest, Amount::ZERO);
    assert_eq!(loan.total_repayment, Amount::units(10));
    assert!(h.ledger.member(&alice).unwrap().has_active_loan);

    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    let approved_at = h.clock.now();
    let due = h.ledger.approve_loan(&cap, loan_id).unwrap();
    assert_eq!(due, approved_at + Duration::days(7));
    assert_eq!(h.ledger.pool_balance(), Amount::units(990));
    assert_eq!(h.ledger.member(&alice).unwrap().total_borrowed, Amount::units(10));

    h.clock.set(due - Duration::days(1));
    let outcome = h.ledger.repay_loan(&alice, loan_id, Amount::units(10)).unwrap();
    assert_eq!(outcome.bonus, 15);

    let member = h.ledger.member(&alice).unwrap();
    assert_eq!(member.score.value(), 65);
    assert!(!member.has_active_loan);
    assert_eq!(member.loans_completed, 1);
    assert_eq!(member.total_repaid, Amount::units(10));
    assert_eq!(h.ledger.pool_balance(), Amount::units(1000));
    assert_eq!(h.ledger.loan_status(loan_id).unwrap(), LoanStatus::Repaid);
}

#[test]
fn test_repayment_bonus_tiers() {
    for (offset_days, expected_bonus) in [(-1, 15), (2, 10), (5, 5), (10, 0)] {
        let mut h = harness();
        let bob = id("bob");
        let cap = h.ledger.authorize_admin(&id("admin")).unwrap();

        let loan = h.ledger.request_loan(&bob, Amount::units(5), "tools").unwrap();
        let due = h.ledger.approve_loan(&cap, loan).unwrap();

        h.clock.set(due + Duration::days(offset_days));
        let total = h.ledger.loan(loan).unwrap().total_repayment;
        let outcome = h.ledger.repay_loan(&bob, loan, total).unwrap();

        assert_eq!(outcome.bonus, expected_bonus, "offset {offset_days}");
        assert_eq!(
            h.ledger.member(&bob).unwrap().score.value(),
            50 + expected_bonus as u32
        );
    }
}

#[test]
fn test_score_saturates_at_100() {
    let mut h = harness();
    set_score(&mut h, "alice", 100);
    assert_eq!(h.ledger.member(&id("alice")).unwrap().score, Score::MAX);
}

#[test]
fn test_second_request_while_active_is_state_error() {
    let mut h = harness();
    let alice = id("alice");
    h.ledger.request_loan(&alice, Amount::units(5), "first").unwrap();

    let err = h.ledger.request_loan(&alice, Amount::units(5), "second").unwrap_err();
    assert_eq!(err, LedgerError::ActiveLoanExists(alice.clone()));
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(h.ledger.loans().len(), 1);
}

#[test]
fn test_request_guards() {
    let mut h = harness();

    // Over the tier limit
    let err = h
        .ledger
        .request_loan(&id("alice"), Amount::units(11), "too much")
        .unwrap_err();
    assert!(matches!(err, LedgerError::LimitExceeded { .. }));

    // Zero amount and empty purpose
    let err = h.ledger.request_loan(&id("alice"), Amount::ZERO, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = h.ledger.request_loan(&id("alice"), Amount::units(1), "  ").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Not a member / inactive circle
    let err = h.ledger.request_loan(&id("dave"), Amount::units(1), "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let lonely = h
        .ledger
        .create_circle(&id("erin"), "Solo", Amount::units(1))
        .unwrap();
    assert!(!h.ledger.circle(lonely).unwrap().active);
    let err = h.ledger.request_loan(&id("erin"), Amount::units(1), "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert!(h.ledger.loans().is_empty());
    assert!(!h.ledger.member(&id("alice")).unwrap().has_active_loan);
}

#[test]
fn test_approve_guards() {
    let mut h = harness();
    let loan = h.ledger.request_loan(&id("alice"), Amount::units(10), "x").unwrap();

    // Non-admin cannot even mint a capability
    let err = h.ledger.authorize_admin(&id("alice")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    // Drain the pool below the principal
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    h.ledger.withdraw_liquidity(&cap, Amount::units(995)).unwrap();
    let err = h.ledger.approve_loan(&cap, loan).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Requested);
    assert_eq!(h.ledger.pool_balance(), Amount::units(5));

    h.ledger.deposit_liquidity(&cap, Amount::units(5)).unwrap();
    h.ledger.approve_loan(&cap, loan).unwrap();
    let err = h.ledger.approve_loan(&cap, loan).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = h.ledger.approve_loan(&cap, LoanId(42)).unwrap_err();
    assert_eq!(err, LedgerError::LoanNotFound(LoanId(42)));
}

#[test]
fn test_deferred_approval_then_exact_disbursement() {
    let mut h = harness();
    let carol = id("carol");
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();

    let loan = h.ledger.request_loan(&carol, Amount::units(8), "stall").unwrap();
    h.ledger.approve_loan_deferred(&cap, loan).unwrap();
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Approved);

    // Repay before disbursement is a state error
    let err = h.ledger.repay_loan(&carol, loan, Amount::units(8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    // Payment must equal the principal exactly
    let err = h.ledger.disburse_loan(&cap, loan, Amount::units(7)).unwrap_err();
    assert!(matches!(err, LedgerError::PaymentMismatch { .. }));

    let due = h.ledger.disburse_loan(&cap, loan, Amount::units(8)).unwrap();
    assert_eq!(due, h.clock.now() + Duration::days(7));
    assert_eq!(h.ledger.pool_balance(), Amount::units(1000));
    assert_eq!(h.ledger.member(&carol).unwrap().total_borrowed, Amount::units(8));

    let err = h.ledger.disburse_loan(&cap, loan, Amount::units(8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_only_borrower_repays_exact_total() {
    let mut h = harness();
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    let loan = h.ledger.request_loan(&id("alice"), Amount::units(10), "x").unwrap();
    h.ledger.approve_loan(&cap, loan).unwrap();

    let err = h.ledger.repay_loan(&id("bob"), loan, Amount::units(10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = h.ledger.repay_loan(&id("alice"), loan, Amount::units(11)).unwrap_err();
    assert!(matches!(err, LedgerError::PaymentMismatch { .. }));

    h.ledger.repay_loan(&id("alice"), loan, Amount::units(10)).unwrap();
    let err = h.ledger.repay_loan(&id("alice"), loan, Amount::units(10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_default_penalty_and_cascade() {
    let mut h = harness();
    let alice = id("alice");
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();

    let loan = h.ledger.request_loan(&alice, Amount::units(10), "x").unwrap();
    let due = h.ledger.approve_loan(&cap, loan).unwrap();

    h.clock.set(due + Duration::days(1));
    assert!(h.ledger.is_loan_overdue(loan).unwrap());
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Overdue);

    // Exactly at due + 14 days is still too early
    h.clock.set(due + Duration::days(14));
    let err = h.ledger.penalize_default(&cap, loan).unwrap_err();
    assert!(matches!(err, LedgerError::NotDefaultEligible { .. }));
    assert_eq!(h.ledger.member(&alice).unwrap().score.value(), 50);

    h.clock.set(due + Duration::days(14) + Duration::seconds(1));
    assert!(h.ledger.is_default_eligible(loan).unwrap());
    let outcome = h.ledger.penalize_default(&cap, loan).unwrap();
    assert_eq!(outcome.new_score.value(), 0);
    assert_eq!(outcome.peers.len(), 2);

    let defaulter = h.ledger.member(&alice).unwrap();
    assert_eq!(defaulter.score.value(), 0);
    assert!(!defaulter.active);
    for peer in ["bob", "carol"] {
        let m = h.ledger.member(&id(peer)).unwrap();
        assert_eq!(m.score.value(), 30);
        assert!(m.active);
    }
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Defaulted);

    // A second penalty on the same loan is rejected and changes nothing
    let err = h.ledger.penalize_default(&cap, loan).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(h.ledger.member(&id("bob")).unwrap().score.value(), 30);

    // Frozen borrowers cannot request, and cannot repay a defaulted loan
    let err = h.ledger.repay_loan(&alice, loan, Amount::units(10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    let err = h.ledger.request_loan(&alice, Amount::units(1), "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    // The zeroed defaulter still reads as 50 in the circle average
    assert_eq!(h.ledger.circle_average_score(h.circle).unwrap().value(), 36);

    h.ledger.unfreeze_account(&cap, &alice).unwrap();
    assert!(h.ledger.member(&alice).unwrap().active);
}

#[test]
fn test_penalize_requires_disbursed_loan() {
    let mut h = harness();
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    let loan = h.ledger.request_loan(&id("bob"), Amount::units(3), "x").unwrap();

    h.clock.advance(Duration::days(60));
    let err = h.ledger.penalize_default(&cap, loan).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn test_trust_score_blending_raises_limit() {
    let mut h = harness();
    set_score(&mut h, "alice", 80);
    assert_eq!(h.ledger.member(&id("alice")).unwrap().score.value(), 80);

    // Circle [80, 50, 50] averages 60 -> floor((80*60 + 60*40) / 100) = 72
    assert_eq!(h.ledger.circle_average_score(h.circle).unwrap().value(), 60);
    assert_eq!(h.ledger.trust_score(&id("alice")).unwrap().value(), 72);
    assert_eq!(h.ledger.max_loan_amount(&id("alice")).unwrap(), Amount::units(50));
    assert_eq!(h.ledger.interest_rate(&id("alice")).unwrap(), 4);
}

#[test]
fn test_transfer_admin_revokes_old_capability() {
    let mut h = harness();
    let old_cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    h.ledger.transfer_admin(&old_cap, id("treasurer")).unwrap();

    let err = h.ledger.deposit_liquidity(&old_cap, Amount::units(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let new_cap = h.ledger.authorize_admin(&id("treasurer")).unwrap();
    h.ledger.deposit_liquidity(&new_cap, Amount::units(1)).unwrap();
    assert_eq!(h.ledger.admin(), &id("treasurer"));
}

#[test]
fn test_short_loan_duration_override() {
    let mut h = harness();
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    h.ledger.set_loan_duration(&cap, Duration::minutes(5)).unwrap();
    assert!(h.ledger.set_loan_duration(&cap, Duration::zero()).is_err());

    let loan = h.ledger.request_loan(&id("bob"), Amount::units(2), "x").unwrap();
    let due = h.ledger.approve_loan(&cap, loan).unwrap();
    assert_eq!(due, h.clock.now() + Duration::minutes(5));
}

#[test]
fn test_loan_duration_beyond_ten_years_rejected() {
    let mut h = harness();

    let err = h
        .ledger
        .execute(
            &id("admin"),
            &Command::SetLoanDuration {
                duration_secs: 9_000_000_000_000_000,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    let err = h
        .ledger
        .set_loan_duration(&cap, Duration::days(3651))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    h.ledger.set_loan_duration(&cap, Duration::days(3650)).unwrap();
    h.ledger.set_loan_duration(&cap, Duration::days(7)).unwrap();
    assert_eq!(h.ledger.loan_duration(), Duration::days(7));

    // Approvals keep working after the rejected overrides
    let loan = h.ledger.request_loan(&id("alice"), Amount::units(5), "x").unwrap();
    let event = h
        .ledger
        .execute(&id("admin"), &Command::ApproveLoan { loan_id: loan })
        .unwrap();
    let expected = h.clock.now() + Duration::days(7);
    assert!(matches!(event, LedgerEvent::LoanApproved { due_at: Some(due), .. } if due == expected));
}

#[test]
fn test_unrepresentable_due_date_leaves_loan_untouched() {
    let mut h = harness();
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();
    let loan = h.ledger.request_loan(&id("alice"), Amount::units(5), "x").unwrap();

    h.clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(1));
    let err = h.ledger.approve_loan(&cap, loan).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Requested);
    assert_eq!(h.ledger.pool_balance(), Amount::units(1000));

    h.ledger.approve_loan_deferred(&cap, loan).unwrap();
    let err = h
        .ledger
        .disburse_loan(&cap, loan, Amount::units(5))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert_eq!(h.ledger.loan_status(loan).unwrap(), LoanStatus::Approved);
    assert_eq!(h.ledger.member(&id("alice")).unwrap().total_borrowed, Amount::ZERO);
}

#[test]
fn test_rejected_deposit_keeps_pool_balance() {
    let mut h = harness();
    let cap = h.ledger.authorize_admin(&id("admin")).unwrap();

    let err = h.ledger.deposit_liquidity(&cap, Amount::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.ledger.pool_balance(), Amount::units(1000));
    assert_eq!(h.ledger.pool().total_deposited(), Amount::units(1000));
}

#[test]
fn test_execute_dispatch_and_admin_check() {
    let mut h = harness();

    let event = h
        .ledger
        .execute(
            &id("bob"),
            &Command::RequestLoan {
                amount: Amount::units(10),
                purpose: "fertilizer".into(),
            },
        )
        .unwrap();
    let loan_id = match event {
        LedgerEvent::LoanRequested { loan_id, .. } => loan_id,
        other => panic!("unexpected event {other:?}"),
    };

    let err = h
        .ledger
        .execute(&id("bob"), &Command::ApproveLoan { loan_id })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let event = h
        .ledger
        .execute(&id("admin"), &Command::ApproveLoan { loan_id })
        .unwrap();
    assert!(matches!(event, LedgerEvent::LoanApproved { due_at: Some(_), .. }));
}
