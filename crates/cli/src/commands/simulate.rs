//! End-to-end run of one contract against an in-memory ledger and a fixed oracle price.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use option_settle_core::{
    collateral_amount, AccountId, Clock, ContractTerms, EventRecord, FixedPoint, ManualClock,
    PriceOracle,
};
use option_settle_engine::{EngineConfig, FixedPriceOracle, InMemoryLedger, SettlementEngine};
use serde::Serialize;
use tracing::info;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Settlement config file
    #[arg(short, long, default_value = "config/settlement.toml")]
    pub config: String,

    /// Account that posts collateral and receives the claims
    #[arg(long)]
    pub writer: String,

    /// Number of claims to write and exercise
    #[arg(long)]
    pub amount: FixedPoint,

    /// Oracle price at exercise, in strike units
    #[arg(long)]
    pub price: FixedPoint,

    /// Writer's starting collateral balance, defaults to exactly the requirement
    #[arg(long)]
    pub fund: Option<FixedPoint>,

    /// Contract creation time (RFC 3339), defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub events: Vec<EventRecord>,
    pub writer_balance: FixedPoint,
    pub escrow_balance: FixedPoint,
    pub outstanding: FixedPoint,
}

pub async fn run_simulate(args: SimulateArgs) -> Result<()> {
    let created_at = args.start.unwrap_or_else(Utc::now);
    let (config, terms) = super::load_contract(&args.config, created_at)?;
    let writer = AccountId::new(args.writer);

    let report = simulate(
        terms,
        EngineConfig::from(&config.engine),
        &writer,
        args.amount,
        args.price,
        args.fund,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Writes `amount` claims for `writer` during issuance, then exercises all of them at
/// the opening of the exercise window.
pub async fn simulate(
    terms: ContractTerms,
    engine_config: EngineConfig,
    writer: &AccountId,
    amount: FixedPoint,
    price: FixedPoint,
    fund: Option<FixedPoint>,
) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new(terms.created_at()));
    let clock_handle: Arc<dyn Clock> = clock.clone();
    let oracle: Arc<dyn PriceOracle> =
        Arc::new(FixedPriceOracle::new(price, clock_handle.clone()));
    let ledger = Arc::new(InMemoryLedger::new());

    let asset = terms.collateral_asset().clone();
    let required = collateral_amount(&terms, amount)?;
    ledger
        .fund(&asset, writer, fund.unwrap_or(required))
        .context("failed to fund writer")?;
    info!(%writer, %asset, funded = %fund.unwrap_or(required), %required, "Writer funded");

    let gateway = engine_config.gateway.clone();
    let escrow = engine_config.escrow_account.clone();
    let engine = SettlementEngine::new(
        terms,
        engine_config,
        ledger.clone(),
        oracle,
        clock_handle,
    );

    engine
        .write(&gateway, amount, writer)
        .await
        .context("write failed")?;

    let window_begins = engine.terms().exercise_window_begins();
    clock.set(window_begins);
    info!(%window_begins, %price, "Clock advanced to exercise window");

    engine
        .exercise(amount, writer)
        .await
        .context("exercise failed")?;

    Ok(SimulationReport {
        events: engine.events(),
        writer_balance: ledger.balance_of(&asset, writer),
        escrow_balance: ledger.balance_of(&asset, &escrow),
        outstanding: engine.total_outstanding(),
    })
}
