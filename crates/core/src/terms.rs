//! Immutable option contract terms.
//!
//! [`ContractTerms`] is built once from [`TermsParams`] and validated against the
//! creation instant. After that it only exposes accessors; the engine holds it by
//! value for its whole lifetime.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::fixed_point::FixedPoint;
use crate::types::{AssetId, ExerciseType, OptionType, UnderlyingAssetType, WindowPhase};

/// Shortest exercise window a European contract may have, in seconds.
pub const MIN_EUROPEAN_WINDOW_SECS: i64 = 86_400;

/// Reasons contract terms are rejected at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{role} asset identifier is blank")]
    InvalidAsset { role: &'static str },

    #[error("underlying and strike asset are both {0}")]
    IdenticalAssets(AssetId),

    #[error("expiry {expiry} is not after creation time {created_at}")]
    ExpiryNotInFuture {
        expiry: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },

    #[error("european contracts require a window duration")]
    MissingWindowDuration,

    #[error("exercise window of {actual_secs}s is shorter than the {min_secs}s minimum")]
    WindowTooShort { actual_secs: i64, min_secs: i64 },

    #[error("call options require an addressable underlying")]
    CallOnNonAddressable,

    #[error("strike price must be positive")]
    ZeroStrikePrice,
}

/// Raw construction input for [`ContractTerms`].
#[derive(Debug, Clone)]
pub struct TermsParams {
    pub underlying_asset: AssetId,
    pub strike_asset: AssetId,
    pub option_type: OptionType,
    pub exercise_type: ExerciseType,
    pub underlying_asset_type: UnderlyingAssetType,
    /// Strike-asset units per one underlying unit.
    pub strike_price: FixedPoint,
    pub expiry: DateTime<Utc>,
    /// Length of the window ending at expiry. Only read for European contracts.
    pub window_duration: Option<Duration>,
}

/// Validated, immutable option terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractTerms {
    underlying_asset: AssetId,
    strike_asset: AssetId,
    collateral_asset: AssetId,
    option_type: OptionType,
    exercise_type: ExerciseType,
    underlying_asset_type: UnderlyingAssetType,
    strike_price: FixedPoint,
    expiry: DateTime<Utc>,
    exercise_window_begins: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl ContractTerms {
    /// Validates `params` as of `created_at`.
    ///
    /// The collateral asset is derived from the option type: the strike asset for
    /// puts and the underlying for calls.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] the parameters violate.
    pub fn new(params: TermsParams, created_at: DateTime<Utc>) -> Result<Self, ConfigurationError> {
        let TermsParams {
            underlying_asset,
            strike_asset,
            option_type,
            exercise_type,
            underlying_asset_type,
            strike_price,
            expiry,
            window_duration,
        } = params;

        if underlying_asset.is_blank() {
            return Err(ConfigurationError::InvalidAsset { role: "underlying" });
        }
        if strike_asset.is_blank() {
            return Err(ConfigurationError::InvalidAsset { role: "strike" });
        }
        if underlying_asset == strike_asset {
            return Err(ConfigurationError::IdenticalAssets(underlying_asset));
        }
        if expiry <= created_at {
            return Err(ConfigurationError::ExpiryNotInFuture { expiry, created_at });
        }
        if strike_price.is_zero() {
            return Err(ConfigurationError::ZeroStrikePrice);
        }
        if underlying_asset_type == UnderlyingAssetType::NonAddressable
            && option_type == OptionType::Call
        {
            return Err(ConfigurationError::CallOnNonAddressable);
        }

        let exercise_window_begins = match exercise_type {
            ExerciseType::European => {
                let window = window_duration.ok_or(ConfigurationError::MissingWindowDuration)?;
                if window < Duration::seconds(MIN_EUROPEAN_WINDOW_SECS) {
                    return Err(ConfigurationError::WindowTooShort {
                        actual_secs: window.num_seconds(),
                        min_secs: MIN_EUROPEAN_WINDOW_SECS,
                    });
                }
                expiry - window
            }
            ExerciseType::American => created_at,
        };

        let collateral_asset = match option_type {
            OptionType::Put => strike_asset.clone(),
            OptionType::Call => underlying_asset.clone(),
        };

        Ok(Self {
            underlying_asset,
            strike_asset,
            collateral_asset,
            option_type,
            exercise_type,
            underlying_asset_type,
            strike_price,
            expiry,
            exercise_window_begins,
            created_at,
        })
    }

    #[must_use]
    pub const fn underlying_asset(&self) -> &AssetId {
        &self.underlying_asset
    }

    #[must_use]
    pub const fn strike_asset(&self) -> &AssetId {
        &self.strike_asset
    }

    #[must_use]
    pub const fn collateral_asset(&self) -> &AssetId {
        &self.collateral_asset
    }

    #[must_use]
    pub const fn option_type(&self) -> OptionType {
        self.option_type
    }

    #[must_use]
    pub const fn exercise_type(&self) -> ExerciseType {
        self.exercise_type
    }

    #[must_use]
    pub const fn underlying_asset_type(&self) -> UnderlyingAssetType {
        self.underlying_asset_type
    }

    #[must_use]
    pub const fn strike_price(&self) -> FixedPoint {
        self.strike_price
    }

    #[must_use]
    pub const fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    #[must_use]
    pub const fn exercise_window_begins(&self) -> DateTime<Utc> {
        self.exercise_window_begins
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Phase of the contract at `now`.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> WindowPhase {
        if now >= self.expiry {
            WindowPhase::Expired
        } else if now >= self.exercise_window_begins {
            WindowPhase::Exercise
        } else {
            WindowPhase::Issuance
        }
    }
}
