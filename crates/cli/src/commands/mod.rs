//! CLI commands for the settlement engine.

pub mod quote;
pub mod simulate;

pub use quote::{run_quote, QuoteArgs};
pub use simulate::{run_simulate, SimulateArgs};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use option_settle_core::{ConfigLoader, ContractTerms, SettlementConfig};

/// Loads a settlement config and validates its terms as of `created_at`.
fn load_contract(
    path: &str,
    created_at: DateTime<Utc>,
) -> Result<(SettlementConfig, ContractTerms)> {
    let config = ConfigLoader::load(path).with_context(|| format!("failed to load {path}"))?;
    let terms = ContractTerms::new(config.terms.to_params(), created_at)
        .context("invalid contract terms")?;
    Ok((config, terms))
}
