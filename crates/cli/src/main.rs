use clap::{Parser, Subcommand};

mod commands;

use commands::{QuoteArgs, SimulateArgs};

#[derive(Parser)]
#[command(name = "option-settle")]
#[command(about = "Collateralized, cash-settled option settlement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the collateral and payout for an amount of claims
    Quote(QuoteArgs),
    /// Write and exercise claims against an in-memory ledger
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Quote(args) => commands::run_quote(args)?,
        Commands::Simulate(args) => commands::run_simulate(args).await?,
    }

    Ok(())
}
