//! Core types for a collateralized, cash-settled options settlement engine.
//!
//! - [`FixedPoint`]: 18-decimal unsigned numbers with checked arithmetic
//! - [`ContractTerms`]: validated, immutable option parameters
//! - [`valuation`]: collateral requirement and payout formulas
//! - [`Ledger`], [`PriceOracle`], [`Clock`]: collaborator seams the engine drives

pub mod clock;
pub mod config;
pub mod config_loader;
pub mod events;
pub mod fixed_point;
pub mod terms;
pub mod traits;
pub mod types;
pub mod valuation;

pub use clock::{ManualClock, SystemClock};
pub use config::{EngineSettings, SettlementConfig, TermsConfig};
pub use config_loader::{ConfigLoadError, ConfigLoader};
pub use events::{EventRecord, SettlementEvent};
pub use fixed_point::{ArithmeticError, FixedPoint, DECIMALS, SCALE};
pub use terms::{ConfigurationError, ContractTerms, TermsParams, MIN_EUROPEAN_WINDOW_SECS};
pub use traits::{Clock, Ledger, LedgerError, OracleError, PriceOracle, PriceQuote};
pub use types::{AccountId, AssetId, ExerciseType, OptionType, UnderlyingAssetType, WindowPhase};
pub use valuation::{collateral_amount, intrinsic_value, payout_value, ValuationError};
