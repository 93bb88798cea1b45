//! Admin capability
//!
//! Admin-only operations take an `AdminCap` instead of trusting an ambient
//! caller. A capability can only be minted by `AdminRole::authorize`, and it
//! is bound to the admin generation: `transfer` bumps the generation so every
//! capability issued to the previous admin stops verifying.

use trustcircle_core::MemberId;

use crate::error::{LedgerError, LedgerResult};

/// Proof that the holder was the admin when the capability was issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCap {
    holder: MemberId,
    generation: u64,
}

impl AdminCap {
    pub fn holder(&self) -> &MemberId {
        &self.holder
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AdminRole {
    admin: MemberId,
    generation: u64,
}

impl AdminRole {
    pub(crate) fn new(admin: MemberId) -> Self {
        Self {
            admin,
            generation: 0,
        }
    }

    pub(crate) fn admin(&self) -> &MemberId {
        &self.admin
    }

    pub(crate) fn authorize(&self, caller: &MemberId) -> LedgerResult<AdminCap> {
        if caller != &self.admin {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the admin",
                caller
            )));
        }
        Ok(AdminCap {
            holder: caller.clone(),
            generation: self.generation,
        })
    }

    pub(crate) fn verify(&self, cap: &AdminCap) -> LedgerResult<()> {
        if cap.generation != self.generation || cap.holder != self.admin {
            return Err(LedgerError::Unauthorized(format!(
                "stale or foreign admin capability held by {}",
                cap.holder
            )));
        }
        Ok(())
    }

    /// Hand the role over. Returns the previous admin.
    pub(crate) fn transfer(&mut self, new_admin: MemberId) -> MemberId {
        self.generation += 1;
        std::mem::replace(&mut self.admin, new_admin)
    }
}
