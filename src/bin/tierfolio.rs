//! Tierfolio command-line driver.
//!
//! Loads a `date,symbol,adj_close` CSV for the default ETF universe, runs the
//! three-tier optimization and prints the result as JSON.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tierfolio::{
    logging, AccountType, AssetUniverse, EngineConfig, OptimizationOrchestrator,
    OptimizationRequest, PricePanel,
};

#[derive(Parser)]
#[command(name = "tierfolio")]
#[command(about = "Risk-tiered portfolio recommendations from historical prices")]
struct Cli {
    /// CSV price history with columns date,symbol,adj_close
    #[arg(long)]
    prices: PathBuf,

    /// Current savings
    #[arg(long)]
    savings: f64,

    /// Time horizon in years
    #[arg(long)]
    horizon: f64,

    /// Target wealth at the end of the horizon
    #[arg(long)]
    target: Option<f64>,

    /// Account type: taxable, tax_deferred or tax_free
    #[arg(long, default_value = "taxable")]
    account: AccountType,

    /// New money is available for contribution-based rebalancing
    #[arg(long)]
    new_money: bool,

    /// Maximum annual contribution
    #[arg(long)]
    max_contribution: Option<f64>,

    /// Engine config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    let universe = AssetUniverse::default_etf();
    let file = File::open(&cli.prices)
        .with_context(|| format!("opening price file {}", cli.prices.display()))?;
    let prices = PricePanel::from_csv_reader(&universe, file)?;
    info!("Loaded {} price dates for {}", prices.len(), universe);

    let mut request = OptimizationRequest::new(cli.savings, cli.horizon).with_account_type(cli.account);
    if let Some(target) = cli.target {
        request = request.with_target(target);
    }
    if cli.new_money || cli.max_contribution.is_some() {
        request = request.with_new_money(cli.max_contribution);
    }

    let engine = OptimizationOrchestrator::new(config, universe)?;
    let result = engine.optimize(&request, &prices)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
