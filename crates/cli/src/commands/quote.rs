//! Collateral and payout quotes for a configured contract.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use option_settle_core::{
    collateral_amount, intrinsic_value, payout_value, ContractTerms, FixedPoint,
};

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Settlement config file
    #[arg(short, long, default_value = "config/settlement.toml")]
    pub config: String,

    /// Number of claims to quote
    #[arg(long)]
    pub amount: FixedPoint,

    /// Underlying price in strike units; enables the payout quote
    #[arg(long)]
    pub price: Option<FixedPoint>,

    /// Contract creation time (RFC 3339), defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub collateral: FixedPoint,
    pub intrinsic: Option<FixedPoint>,
    pub payout: Option<FixedPoint>,
}

/// Values `amount` claims, and their payout at `price` when one is given.
pub fn quote(
    terms: &ContractTerms,
    amount: FixedPoint,
    price: Option<FixedPoint>,
) -> Result<Quote> {
    let collateral = collateral_amount(terms, amount)?;
    let (intrinsic, payout) = match price {
        Some(price) => (
            Some(intrinsic_value(terms, price)),
            Some(payout_value(terms, price, amount)?),
        ),
        None => (None, None),
    };
    Ok(Quote {
        collateral,
        intrinsic,
        payout,
    })
}

pub fn run_quote(args: QuoteArgs) -> Result<()> {
    let created_at = args.start.unwrap_or_else(Utc::now);
    let (_, terms) = super::load_contract(&args.config, created_at)?;
    let result = quote(&terms, args.amount, args.price)?;

    println!();
    println!("{}", "=".repeat(60));
    println!(
        "{} {} {}/{} @ {}",
        terms.exercise_type(),
        terms.option_type(),
        terms.underlying_asset(),
        terms.strike_asset(),
        terms.strike_price()
    );
    println!("{}", "=".repeat(60));
    println!("Window opens:  {}", terms.exercise_window_begins());
    println!("Expiry:        {}", terms.expiry());
    println!("Amount:        {}", args.amount);
    println!("Collateral:    {} {}", result.collateral, terms.collateral_asset());
    if let (Some(price), Some(intrinsic), Some(payout)) =
        (args.price, result.intrinsic, result.payout)
    {
        println!("Price:         {price}");
        println!("Intrinsic:     {intrinsic} {} per unit", terms.strike_asset());
        println!("Payout:        {payout} {}", terms.collateral_asset());
    }
    println!("{}", "=".repeat(60));

    Ok(())
}
