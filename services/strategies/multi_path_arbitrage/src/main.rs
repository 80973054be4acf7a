//! Multi-Path Arbitrage Binary
//!
//! Paper-trades against a simulated constant-product pool book seeded from the
//! `[simulation]` config section.

use clap::Parser;
use multi_path_arbitrage::{MultiPathArbitrageStrategy, MultiPathConfig, SimulatedMarket};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multi_path_arbitrage")]
#[command(about = "Triangular and quadrangular arbitrage scanner with rollback")]
struct Args {
    /// Configuration file path (TOML or JSON); defaults plus MULTIPATH_* env vars when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,

    /// Execute the top opportunity each cycle (overrides scan.auto_execute)
    #[arg(long)]
    execute: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("🚀 Starting Multi-Path Arbitrage Scanner");

    let mut config = match &args.config {
        Some(path) => {
            let path_str = path.to_string_lossy();
            let config = MultiPathConfig::from_file(&path_str)
                .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path_str, e))?
                .with_env_overrides();
            info!("📋 Configuration loaded from: {:?}", path);
            config
        }
        None => MultiPathConfig::from_env(),
    };
    if args.execute {
        config.scan.auto_execute = true;
    }
    config.validate()?;

    let market = Arc::new(SimulatedMarket::from_config(&config.simulation));
    info!("✅ Simulated market seeded with {} pools", config.simulation.pools.len());

    let strategy = Arc::new(MultiPathArbitrageStrategy::new(
        config,
        market.clone(),
        market.clone(),
    )?);

    let paths = strategy.refresh_paths().await;
    info!("✅ {} paths generated", paths);

    if args.once {
        let opportunities = strategy.scan_for_opportunities().await;
        for opp in opportunities.iter().take(10) {
            info!(
                "{} net {:.4}% priority {:.1} risk {} executable={}",
                opp.path_name(),
                opp.net_profit_percent,
                opp.priority,
                opp.path_risk.level,
                opp.is_executable(&strategy.get_config())
            );
        }
        if let Some(report) = strategy.last_execution() {
            info!("Execution: {}", report.summary());
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(strategy.clone().run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("📡 Received shutdown signal");
    if shutdown_tx.send(true).is_err() {
        warn!("Scanner already stopped");
    }
    runner.await?;

    if let Some(pending) = strategy.pending_rollback() {
        warn!(
            "Manual rollback still pending for {}: {} {}",
            pending.path_name, pending.stranded.amount, pending.stranded.token
        );
    }

    info!("✅ Multi-path arbitrage scanner stopped");
    Ok(())
}
