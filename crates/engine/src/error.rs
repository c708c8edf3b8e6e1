//! Operational errors. A failed operation leaves claims, escrow and the event log unchanged.

use chrono::{DateTime, Utc};
use option_settle_core::{AccountId, FixedPoint, LedgerError, OracleError, ValuationError};
use thiserror::Error;

use crate::claims::ClaimError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("{caller} is not the authorized writer")]
    Unauthorized { caller: AccountId },

    #[error("invalid write amount")]
    InvalidAmount,

    #[error("exercise window opened at {begins}; cannot write at {now}")]
    WindowAlreadyOpen {
        now: DateTime<Utc>,
        begins: DateTime<Utc>,
    },

    #[error("call collateral requires an addressable underlying")]
    UnsupportedAssetType,

    #[error("insufficient collateral: available {available}, required {required}")]
    InsufficientFunds {
        available: FixedPoint,
        required: FixedPoint,
    },

    #[error("arithmetic overflow while writing")]
    Overflow,

    /// Called from a collaborator while this engine was already writing or exercising.
    #[error("write issued while another engine operation is in progress")]
    Reentrant,

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<ValuationError> for WriteError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::UnsupportedAssetType => Self::UnsupportedAssetType,
            // Collateral never divides, so only overflow remains.
            ValuationError::Overflow | ValuationError::DivisionByZero => Self::Overflow,
        }
    }
}

impl From<LedgerError> for WriteError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                requested,
                ..
            } => Self::InsufficientFunds {
                available,
                required: requested,
            },
            other => Self::Ledger(other),
        }
    }
}

impl From<ClaimError> for WriteError {
    fn from(_: ClaimError) -> Self {
        Self::Overflow
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExerciseError {
    #[error("exercise window opens at {begins}; now is {now}")]
    WindowNotOpen {
        now: DateTime<Utc>,
        begins: DateTime<Utc>,
    },

    #[error("contract expired at {expiry}; now is {now}")]
    WindowClosed {
        now: DateTime<Utc>,
        expiry: DateTime<Utc>,
    },

    #[error("invalid exercise amount")]
    InvalidAmount,

    #[error("claim balance {available} is below {requested}")]
    InsufficientClaimBalance {
        available: FixedPoint,
        requested: FixedPoint,
    },

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    /// Escrow cannot cover a payout. Collateralization was broken elsewhere.
    #[error("escrow shortfall: available {available}, required {required}")]
    EscrowShortfall {
        available: FixedPoint,
        required: FixedPoint,
    },

    #[error("arithmetic overflow while exercising")]
    Overflow,

    /// Called from a collaborator while this engine was already writing or exercising.
    #[error("exercise issued while another engine operation is in progress")]
    Reentrant,

    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl ExerciseError {
    /// True for failures that indicate a broken engine invariant rather than a caller mistake.
    #[must_use]
    pub const fn is_internal_fault(&self) -> bool {
        matches!(self, Self::EscrowShortfall { .. })
    }
}

impl From<ValuationError> for ExerciseError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::DivisionByZero => Self::OracleUnavailable(OracleError::InvalidPrice),
            // Payout valuation never reports an unsupported asset type.
            ValuationError::Overflow | ValuationError::UnsupportedAssetType => Self::Overflow,
        }
    }
}

impl From<ClaimError> for ExerciseError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Insufficient {
                available,
                requested,
            } => Self::InsufficientClaimBalance {
                available,
                requested,
            },
            ClaimError::Overflow => Self::Overflow,
        }
    }
}
