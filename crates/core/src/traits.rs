use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fixed_point::FixedPoint;
use crate::types::{AccountId, AssetId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient {asset} in {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        asset: AssetId,
        account: AccountId,
        available: FixedPoint,
        requested: FixedPoint,
    },

    #[error("balance overflow crediting {asset} to {account}")]
    Overflow { asset: AssetId, account: AccountId },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("price feed unavailable: {0}")]
    Unavailable(String),

    #[error("price published at {published_at} is older than {max_age_secs}s")]
    Stale {
        published_at: DateTime<Utc>,
        max_age_secs: i64,
    },

    #[error("price feed returned a zero price")]
    InvalidPrice,
}

/// Spot price with the instant it was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Strike-asset units per underlying unit.
    pub price: FixedPoint,
    pub published_at: DateTime<Utc>,
}

/// Balance keeper for collateral assets.
///
/// Each call either applies fully or fails with no effect.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balance(
        &self,
        asset: &AssetId,
        account: &AccountId,
    ) -> Result<FixedPoint, LedgerError>;

    async fn debit(
        &self,
        asset: &AssetId,
        from: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError>;

    async fn credit(
        &self,
        asset: &AssetId,
        to: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError>;

    /// Moves `amount` from one account to another as a single outcome.
    ///
    /// The default composes `debit` and `credit`; if the credit fails the debit is
    /// reversed before the error is returned.
    async fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: FixedPoint,
    ) -> Result<(), LedgerError> {
        self.debit(asset, from, amount).await?;
        if let Err(err) = self.credit(asset, to, amount).await {
            if let Err(rollback) = self.credit(asset, from, amount).await {
                tracing::error!(
                    %asset,
                    %from,
                    %amount,
                    error = %rollback,
                    "Failed to reverse debit after credit failure"
                );
            }
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn spot(&self) -> Result<PriceQuote, OracleError>;
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
