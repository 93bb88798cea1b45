//! Liquidity pool - guarded balance counter
//!
//! No interest accrues on the balance. Disbursements draw from it and
//! repayments flow back into it.

use serde::{Deserialize, Serialize};
use trustcircle_core::Amount;

use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    balance: Amount,
    total_deposited: Amount,
    total_withdrawn: Amount,
}

impl LiquidityPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    pub fn ensure_covers(&self, required: Amount) -> LedgerResult<()> {
        if self.balance < required {
            return Err(LedgerError::InsufficientLiquidity {
                available: self.balance,
                required,
            });
        }
        Ok(())
    }

    pub(crate) fn deposit(&mut self, amount: Amount) -> LedgerResult<Amount> {
        require_positive(amount)?;
        let balance = self.add(amount)?;
        let total = self
            .total_deposited
            .checked_add(&amount)
            .ok_or_else(overflow)?;
        self.balance = balance;
        self.total_deposited = total;
        Ok(self.balance)
    }

    pub(crate) fn withdraw(&mut self, amount: Amount) -> LedgerResult<Amount> {
        require_positive(amount)?;
        self.ensure_covers(amount)?;
        let total = self
            .total_withdrawn
            .checked_add(&amount)
            .ok_or_else(overflow)?;
        self.balance = self.subtract(amount)?;
        self.total_withdrawn = total;
        Ok(self.balance)
    }

    /// Balance after crediting `amount`, without applying it
    pub(crate) fn add(&self, amount: Amount) -> LedgerResult<Amount> {
        self.balance.checked_add(&amount).ok_or_else(overflow)
    }

    /// Balance after debiting `amount`, without applying it
    pub(crate) fn subtract(&self, amount: Amount) -> LedgerResult<Amount> {
        self.balance
            .checked_sub(&amount)
            .ok_or(LedgerError::InsufficientLiquidity {
                available: self.balance,
                required: amount,
            })
    }

    pub(crate) fn set_balance(&mut self, balance: Amount) {
        self.balance = balance;
    }
}

fn require_positive(amount: Amount) -> LedgerResult<()> {
    if amount.is_zero() {
        return Err(LedgerError::InvalidInput("amount must be positive".into()));
    }
    Ok(())
}

fn overflow() -> LedgerError {
    LedgerError::InvalidInput("pool balance overflow".into())
}
