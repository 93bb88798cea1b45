//! Default handler - penalty and circle cascade
//!
//! The defaulter loses 50 points and is frozen. Every other member of the
//! defaulter's circle loses 20 points but stays active. Scores floor at 0.
//!
//! The cascade is a bounded loop over at most `max_circle_members` peers.
//! It is NOT idempotent: the loan's `defaulted` marker is what keeps a second
//! penalty from being applied.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use trustcircle_core::{MemberId, Score};
use trustcircle_scoring::ScoreEngine;

use crate::circle::{CircleId, CircleRegistry};
use crate::error::{LedgerError, LedgerResult};
use crate::loan::{LoanId, LoanLedger};
use crate::member::MemberLedger;

pub const DEFAULTER_PENALTY: i32 = 50;
pub const PEER_PENALTY: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerPenalty {
    pub member: MemberId,
    pub previous_score: Score,
    pub new_score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultOutcome {
    pub defaulter: MemberId,
    pub previous_score: Score,
    pub new_score: Score,
    pub peers: Vec<PeerPenalty>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl DefaultHandler {
    /// Peer penalties for `defaulter`'s circle, computed but not applied
    pub fn plan_cascade(
        circles: &CircleRegistry,
        members: &MemberLedger,
        circle_id: CircleId,
        defaulter: &MemberId,
    ) -> LedgerResult<Vec<PeerPenalty>> {
        let circle = circles
            .get(circle_id)
            .ok_or(LedgerError::CircleNotFound(circle_id))?;

        let mut peers = Vec::with_capacity(circle.member_count());
        for peer in &circle.members {
            if peer == defaulter {
                continue;
            }
            let previous_score = members.require(peer)?.score;
            peers.push(PeerPenalty {
                member: peer.clone(),
                previous_score,
                new_score: ScoreEngine::adjust(previous_score, -PEER_PENALTY),
            });
        }
        Ok(peers)
    }

    /// Apply a planned cascade
    pub(crate) fn apply_cascade(members: &mut MemberLedger, peers: &[PeerPenalty]) {
        for penalty in peers {
            if let Some(member) = members.get_mut(&penalty.member) {
                member.score = penalty.new_score;
            }
        }
    }

    /// Penalize a defaulted loan and cascade to the borrower's circle.
    pub fn penalize(
        loans: &mut LoanLedger,
        members: &mut MemberLedger,
        circles: &CircleRegistry,
        loan_id: LoanId,
        grace: Duration,
        now: DateTime<Utc>,
    ) -> LedgerResult<DefaultOutcome> {
        let loan = loans.check_default_eligible(loan_id, grace, now)?;
        let defaulter = loan.borrower.clone();

        let member = members.require(&defaulter)?;
        let previous_score = member.score;
        let new_score = ScoreEngine::adjust(previous_score, -DEFAULTER_PENALTY);
        let peers = match member.circle {
            Some(circle_id) => Self::plan_cascade(circles, members, circle_id, &defaulter)?,
            None => Vec::new(),
        };

        // Commit
        if let Some(member) = members.get_mut(&defaulter) {
            member.score = new_score;
            member.active = false;
        }
        Self::apply_cascade(members, &peers);
        loans.mark_defaulted(loan_id, now);

        Ok(DefaultOutcome {
            defaulter,
            previous_score,
            new_score,
            peers,
        })
    }
}
