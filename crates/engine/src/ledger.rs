//! In-memory ledger for simulations and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use option_settle_core::{AccountId, AssetId, FixedPoint, Ledger, LedgerError};
use parking_lot::RwLock;
use tracing::debug;

type BalanceKey = (AssetId, AccountId);

/// Balances keyed by `(asset, account)`. Every mutation is all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<BalanceKey, FixedPoint>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an external deposit to `account`.
    pub fn fund(
        &self,
        asset: &AssetId,
        account: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        credit_in(&mut balances, asset, account, amount)
    }

    #[must_use]
    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> FixedPoint {
        self.balances
            .read()
            .get(&(asset.clone(), account.clone()))
            .copied()
            .unwrap_or_default()
    }
}

fn debit_in(
    balances: &mut HashMap<BalanceKey, FixedPoint>,
    asset: &AssetId,
    account: &AccountId,
    amount: FixedPoint,
) -> Result<(), LedgerError> {
    let key = (asset.clone(), account.clone());
    let available = balances.get(&key).copied().unwrap_or_default();
    let remaining = available
        .checked_sub(amount)
        .map_err(|_| LedgerError::InsufficientFunds {
            asset: asset.clone(),
            account: account.clone(),
            available,
            requested: amount,
        })?;
    balances.insert(key, remaining);
    Ok(())
}

fn credit_in(
    balances: &mut HashMap<BalanceKey, FixedPoint>,
    asset: &AssetId,
    account: &AccountId,
    amount: FixedPoint,
) -> Result<(), LedgerError> {
    let key = (asset.clone(), account.clone());
    let current = balances.get(&key).copied().unwrap_or_default();
    let updated = current
        .checked_add(amount)
        .map_err(|_| LedgerError::Overflow {
            asset: asset.clone(),
            account: account.clone(),
        })?;
    balances.insert(key, updated);
    Ok(())
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balance(
        &self,
        asset: &AssetId,
        account: &AccountId,
    ) -> Result<FixedPoint, LedgerError> {
        Ok(self.balance_of(asset, account))
    }

    async fn debit(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError> {
        debit_in(&mut self.balances.write(), asset, from, amount)
    }

    async fn credit(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError> {
        credit_in(&mut self.balances.write(), asset, to, amount)
    }

    /// Applies both legs under one lock; a failed credit restores the debit.
    async fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError> {
        let mut balances = self.balances.write();
        debit_in(&mut balances, asset, from, amount)?;
        if let Err(err) = credit_in(&mut balances, asset, to, amount) {
            // Restoring what was just debited cannot overflow.
            let _ = credit_in(&mut balances, asset, from, amount);
            return Err(err);
        }
        debug!(%asset, %from, %to, %amount, "Ledger transfer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> AssetId {
        AssetId::new("USDC")
    }

    #[tokio::test]
    async fn transfer_moves_funds() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        let escrow = AccountId::new("escrow");
        ledger
            .fund(&usdc(), &alice, FixedPoint::from_units(100))
            .unwrap();

        ledger
            .transfer(&usdc(), &alice, &escrow, FixedPoint::from_units(40))
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(&usdc(), &alice), FixedPoint::from_units(60));
        assert_eq!(ledger.balance_of(&usdc(), &escrow), FixedPoint::from_units(40));
        assert_eq!(ledger.balances.read().len(), 2);
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_effect() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        let escrow = AccountId::new("escrow");
        ledger.fund(&usdc(), &alice, FixedPoint::from_units(10)).unwrap();

        let err = ledger
            .transfer(&usdc(), &alice, &escrow, FixedPoint::from_units(11))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.balance_of(&usdc(), &alice), FixedPoint::from_units(10));
        assert_eq!(ledger.balance_of(&usdc(), &escrow), FixedPoint::ZERO);
    }

    #[tokio::test]
    async fn overflowing_credit_restores_debit() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        let whale = AccountId::new("whale");
        ledger.fund(&usdc(), &alice, FixedPoint::from_units(1)).unwrap();
        ledger
            .fund(&usdc(), &whale, FixedPoint::from_raw(u128::MAX))
            .unwrap();

        let err = ledger
            .transfer(&usdc(), &alice, &whale, FixedPoint::from_units(1))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Overflow { .. }));
        assert_eq!(ledger.balance_of(&usdc(), &alice), FixedPoint::from_units(1));
    }

    #[tokio::test]
    async fn assets_are_isolated() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new("alice");
        let weth = AssetId::new("WETH");
        ledger.fund(&weth, &alice, FixedPoint::from_units(3)).unwrap();
        assert_eq!(ledger.balance(&usdc(), &alice).await.unwrap(), FixedPoint::ZERO);
        assert_eq!(
            ledger.balance(&weth, &alice).await.unwrap(),
            FixedPoint::from_units(3)
        );
    }
}
