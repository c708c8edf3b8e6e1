use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fixed_point::FixedPoint;
use crate::types::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementEvent {
    /// Claims issued to `account` against posted collateral.
    Written {
        account: AccountId,
        amount: FixedPoint,
        collateral: FixedPoint,
    },
    /// Claims redeemed by `account`; `payout` is in the collateral asset.
    Exercised {
        account: AccountId,
        amount: FixedPoint,
        price: FixedPoint,
        payout: FixedPoint,
    },
}

impl SettlementEvent {
    #[must_use]
    pub const fn account(&self) -> &AccountId {
        match self {
            Self::Written { account, .. } | Self::Exercised { account, .. } => account,
        }
    }

    #[must_use]
    pub const fn amount(&self) -> FixedPoint {
        match self {
            Self::Written { amount, .. } | Self::Exercised { amount, .. } => *amount,
        }
    }
}

/// A recorded notification. Sequences start at 1 and have no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: SettlementEvent,
}
