//! Settlement engine for collateralized, cash-settled options.
//!
//! [`SettlementEngine`] drives a [`Ledger`](option_settle_core::Ledger) and a
//! [`PriceOracle`](option_settle_core::PriceOracle): `write` escrows collateral and
//! mints claims before the exercise window, `exercise` burns claims and pays their
//! intrinsic value out of escrow inside it.

pub mod claims;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod oracle;

pub use claims::{ClaimBook, ClaimError};
pub use engine::{EngineConfig, SettlementEngine};
pub use error::{ExerciseError, WriteError};
pub use ledger::InMemoryLedger;
pub use oracle::{FixedPriceOracle, ManualPriceOracle};
