//! Member ledger - per-member score and financial counters
//!
//! Members are created when they create or join a circle and are never
//! deleted. Only repayment, default penalties and admin unfreeze mutate them
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trustcircle_core::{Amount, MemberId, Score};
use trustcircle_scoring::ScoreEngine;

use crate::circle::{Circle, CircleId, CircleRegistry};
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub circle: Option<CircleId>,
    pub score: Score,
    pub pledged_bond: Amount,
    pub total_borrowed: Amount,
    pub total_repaid: Amount,
    pub loans_completed: u32,
    /// False while frozen after a default
    pub active: bool,
    pub has_active_loan: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct MemberLedger {
    members: HashMap<MemberId, Member>,
}

impl MemberLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &MemberId) -> Option<&mut Member> {
        self.members.get_mut(id)
    }

    pub fn require(&self, id: &MemberId) -> LedgerResult<&Member> {
        self.members
            .get(id)
            .ok_or_else(|| LedgerError::MemberNotFound(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in id order
    pub fn iter_sorted(&self) -> Vec<&Member> {
        let mut all: Vec<&Member> = self.members.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub(crate) fn check_not_in_circle(&self, id: &MemberId) -> LedgerResult<()> {
        if let Some(circle) = self.members.get(id).and_then(|m| m.circle) {
            return Err(LedgerError::AlreadyInCircle {
                member: id.clone(),
                circle,
            });
        }
        Ok(())
    }

    /// Register a member into a circle. Guards are the caller's job.
    pub(crate) fn enroll(
        &mut self,
        id: &MemberId,
        circle: CircleId,
        bond: Amount,
        initial_score: Score,
        now: DateTime<Utc>,
    ) {
        let member = self.members.entry(id.clone()).or_insert_with(|| Member {
            id: id.clone(),
            circle: None,
            score: initial_score,
            pledged_bond: Amount::ZERO,
            total_borrowed: Amount::ZERO,
            total_repaid: Amount::ZERO,
            loans_completed: 0,
            active: true,
            has_active_loan: false,
            joined_at: now,
        });
        member.circle = Some(circle);
        member.pledged_bond = bond;
    }

    /// Current average of a circle's member scores
    pub fn circle_average(&self, circle: &Circle) -> Score {
        ScoreEngine::circle_average(
            circle
                .members
                .iter()
                .map(|m| self.members.get(m).map_or(Score::MIN, |m| m.score)),
        )
    }

    /// Blended trust score used for credit decisions
    pub fn trust_score(&self, circles: &CircleRegistry, id: &MemberId) -> LedgerResult<Score> {
        let member = self.require(id)?;
        let average = member
            .circle
            .and_then(|cid| circles.get(cid))
            .filter(|circle| circle.active)
            .map(|circle| self.circle_average(circle));
        Ok(ScoreEngine::trust_score(member.score, average))
    }
}
