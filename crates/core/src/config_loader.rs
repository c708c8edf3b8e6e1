use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use thiserror::Error;

use crate::config::SettlementConfig;

/// Environment prefix for overrides, e.g. `OPTION_SETTLE_ENGINE__GATEWAY`.
pub const ENV_PREFIX: &str = "OPTION_SETTLE_";

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigLoadError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads settlement configuration from a TOML file, with environment overrides.
    ///
    /// Nested keys use `__` in variable names: `OPTION_SETTLE_TERMS__STRIKE_PRICE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a field is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<SettlementConfig, ConfigLoadError> {
        let config: SettlementConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        tracing::debug!(path = %path.as_ref().display(), "Settlement config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::FixedPoint;
    use crate::types::{AccountId, ExerciseType, OptionType, UnderlyingAssetType};
    use figment::Jail;

    const CONFIG: &str = r#"
        [terms]
        underlying_asset = "WETH"
        strike_asset = "USDC"
        option_type = "put"
        exercise_type = "european"
        strike_price = "1800"
        expiry = "2026-12-31T00:00:00Z"
        window_duration_secs = 172800

        [engine]
        gateway = "gateway"
        max_price_age_secs = 300
    "#;

    #[test]
    fn loads_toml_with_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settle.toml", CONFIG)?;
            let config = ConfigLoader::load("settle.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.terms.option_type, OptionType::Put);
            assert_eq!(config.terms.exercise_type, ExerciseType::European);
            assert_eq!(
                config.terms.underlying_asset_type,
                UnderlyingAssetType::Addressable
            );
            assert_eq!(config.terms.strike_price, FixedPoint::from_units(1800));
            assert_eq!(config.engine.escrow_account, AccountId::new("escrow"));
            assert_eq!(config.engine.max_price_age_secs, Some(300));

            let params = config.terms.to_params();
            assert_eq!(params.window_duration, Some(chrono::Duration::days(2)));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("settle.toml", CONFIG)?;
            jail.set_env("OPTION_SETTLE_ENGINE__GATEWAY", "issuer-desk");
            jail.set_env("OPTION_SETTLE_TERMS__UNDERLYING_ASSET", "WBTC");
            jail.set_env("OPTION_SETTLE_TERMS__STRIKE_PRICE", "1900");
            let config = ConfigLoader::load("settle.toml").map_err(|e| e.to_string())?;

            assert_eq!(config.engine.gateway, AccountId::new("issuer-desk"));
            assert_eq!(config.terms.underlying_asset.as_str(), "WBTC");
            assert_eq!(config.terms.strike_price, FixedPoint::from_units(1900));
            Ok(())
        });
    }

    #[test]
    fn missing_field_is_an_error() {
        Jail::expect_with(|jail| {
            jail.create_file("settle.toml", "[engine]\ngateway = \"g\"\n")?;
            assert!(ConfigLoader::load("settle.toml").is_err());
            Ok(())
        });
    }
}
