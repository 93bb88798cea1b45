//! Circle registry
//!
//! Circles are append-only: members join, nobody leaves, and once a circle
//! reaches the activation threshold it stays active forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use trustcircle_core::{Amount, MemberId};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::member::MemberLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircleId(pub u64);

impl fmt::Display for CircleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub id: CircleId,
    pub name: String,
    /// Join order is preserved
    pub members: Vec<MemberId>,
    pub total_stake: Amount,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

impl Circle {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, member: &MemberId) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub member_count: usize,
    /// True only on the join that flipped the circle active
    pub activated: bool,
}

/// Arena of circles indexed by `CircleId` (ids start at 1)
#[derive(Debug, Default, Clone)]
pub struct CircleRegistry {
    circles: Vec<Circle>,
}

impl CircleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CircleId) -> Option<&Circle> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.circles.get(index)
    }

    fn get_mut(&mut self, id: CircleId) -> Option<&mut Circle> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.circles.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Circle> {
        self.circles.iter()
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    fn next_id(&self) -> CircleId {
        CircleId(self.circles.len() as u64 + 1)
    }

    /// Create a circle with `creator` as its sole member.
    ///
    /// Registers the creator in `members` as part of the same commit.
    pub fn create(
        &mut self,
        members: &mut MemberLedger,
        config: &LedgerConfig,
        creator: &MemberId,
        name: &str,
        bond: Amount,
        now: DateTime<Utc>,
    ) -> LedgerResult<CircleId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("circle name cannot be empty".into()));
        }
        check_stake(config, bond)?;
        members.check_not_in_circle(creator)?;

        let id = self.next_id();
        self.circles.push(Circle {
            id,
            name: name.to_string(),
            members: vec![creator.clone()],
            total_stake: bond,
            created_at: now,
            active: false,
            activated_at: None,
        });
        members.enroll(creator, id, bond, config.initial_score, now);

        Ok(id)
    }

    /// Add `member` to an existing circle.
    pub fn join(
        &mut self,
        members: &mut MemberLedger,
        config: &LedgerConfig,
        member: &MemberId,
        circle_id: CircleId,
        bond: Amount,
        now: DateTime<Utc>,
    ) -> LedgerResult<JoinOutcome> {
        check_stake(config, bond)?;
        members.check_not_in_circle(member)?;

        let circle = self
            .get(circle_id)
            .ok_or(LedgerError::CircleNotFound(circle_id))?;
        if circle.member_count() >= config.max_circle_members {
            return Err(LedgerError::CircleFull {
                circle: circle_id,
                max: config.max_circle_members,
            });
        }
        let total_stake = circle.total_stake.checked_add(&bond).ok_or_else(|| {
            LedgerError::InvalidInput("circle stake overflow".into())
        })?;

        // Commit
        let circle = self
            .get_mut(circle_id)
            .ok_or(LedgerError::CircleNotFound(circle_id))?;
        circle.members.push(member.clone());
        circle.total_stake = total_stake;

        let member_count = circle.member_count();
        let activated = !circle.active && member_count >= config.activation_threshold;
        if activated {
            circle.active = true;
            circle.activated_at = Some(now);
        }
        members.enroll(member, circle_id, bond, config.initial_score, now);

        Ok(JoinOutcome {
            member_count,
            activated,
        })
    }
}

fn check_stake(config: &LedgerConfig, bond: Amount) -> LedgerResult<()> {
    if bond < config.minimum_stake {
        return Err(LedgerError::StakeTooLow {
            minimum: config.minimum_stake,
            actual: bond,
        });
    }
    Ok(())
}
