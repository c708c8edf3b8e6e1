use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::fixed_point::FixedPoint;
use crate::terms::TermsParams;
use crate::types::{AccountId, AssetId, ExerciseType, OptionType, UnderlyingAssetType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    pub terms: TermsConfig,
    pub engine: EngineSettings,
}

/// Contract terms as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsConfig {
    pub underlying_asset: AssetId,
    pub strike_asset: AssetId,
    pub option_type: OptionType,
    pub exercise_type: ExerciseType,
    #[serde(default = "default_underlying_asset_type")]
    pub underlying_asset_type: UnderlyingAssetType,
    pub strike_price: FixedPoint,
    pub expiry: DateTime<Utc>,
    /// European window length in seconds.
    #[serde(default)]
    pub window_duration_secs: Option<i64>,
}

const fn default_underlying_asset_type() -> UnderlyingAssetType {
    UnderlyingAssetType::Addressable
}

impl TermsConfig {
    #[must_use]
    pub fn to_params(&self) -> TermsParams {
        TermsParams {
            underlying_asset: self.underlying_asset.clone(),
            strike_asset: self.strike_asset.clone(),
            option_type: self.option_type,
            exercise_type: self.exercise_type,
            underlying_asset_type: self.underlying_asset_type,
            strike_price: self.strike_price,
            expiry: self.expiry,
            window_duration: self.window_duration_secs.map(Duration::seconds),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// The only account allowed to write claims.
    pub gateway: AccountId,
    /// Account that holds posted collateral.
    #[serde(default = "default_escrow_account")]
    pub escrow_account: AccountId,
    /// Oldest oracle quote accepted at exercise, in seconds. Unset disables the check.
    #[serde(default)]
    pub max_price_age_secs: Option<u64>,
}

fn default_escrow_account() -> AccountId {
    AccountId::new("escrow")
}
