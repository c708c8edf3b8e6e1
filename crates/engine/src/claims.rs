//! Per-account claim balances.

use std::collections::HashMap;

use option_settle_core::{AccountId, FixedPoint};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("claim balance {available} is below {requested}")]
    Insufficient {
        available: FixedPoint,
        requested: FixedPoint,
    },

    #[error("claim balance overflow")]
    Overflow,
}

/// Outstanding claims by holder, plus their running total.
///
/// `outstanding` always equals the sum of all balances.
#[derive(Debug, Clone, Default)]
pub struct ClaimBook {
    balances: HashMap<AccountId, FixedPoint>,
    outstanding: FixedPoint,
}

impl ClaimBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn balance(&self, account: &AccountId) -> FixedPoint {
        self.balances.get(account).copied().unwrap_or_default()
    }

    #[must_use]
    pub const fn outstanding(&self) -> FixedPoint {
        self.outstanding
    }

    /// Checks that minting `amount` to `account` would not overflow.
    pub fn check_mint(&self, account: &AccountId, amount: FixedPoint) -> Result<(), ClaimError> {
        self.minted(account, amount).map(|_| ())
    }

    /// Adds `amount` to `account`. Leaves the book untouched on overflow.
    pub fn mint(&mut self, account: &AccountId, amount: FixedPoint) -> Result<(), ClaimError> {
        let (balance, outstanding) = self.minted(account, amount)?;
        self.balances.insert(account.clone(), balance);
        self.outstanding = outstanding;
        Ok(())
    }

    fn minted(
        &self,
        account: &AccountId,
        amount: FixedPoint,
    ) -> Result<(FixedPoint, FixedPoint), ClaimError> {
        let balance = self
            .balance(account)
            .checked_add(amount)
            .map_err(|_| ClaimError::Overflow)?;
        let outstanding = self
            .outstanding
            .checked_add(amount)
            .map_err(|_| ClaimError::Overflow)?;
        Ok((balance, outstanding))
    }

    /// Removes `amount` from `account`. Leaves the book untouched if the balance is short.
    pub fn burn(&mut self, account: &AccountId, amount: FixedPoint) -> Result<(), ClaimError> {
        let available = self.balance(account);
        let balance = available
            .checked_sub(amount)
            .map_err(|_| ClaimError::Insufficient {
                available,
                requested: amount,
            })?;
        // Cannot underflow while the sum invariant holds.
        self.outstanding = self.outstanding.saturating_sub(amount);
        if balance.is_zero() {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), balance);
        }
        Ok(())
    }
}
