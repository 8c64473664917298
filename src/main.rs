//! Fairline entry point.
//!
//! `--once` scans the configured quote snapshot and prints the opportunities as
//! JSON. Without it the refresh loop runs until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fairline::config::{AppConfig, LoggingConfig};
use fairline::persistence::{CsvQuoteSource, OpportunityStore};
use fairline::scanner::refresh::run_once;
use fairline::scanner::{run_refresh_loop, Scanner};

#[derive(Parser)]
#[command(name = "fairline", version, about = "Fair odds and EV scanner")]
struct Cli {
    /// Scan once, print opportunities as JSON and exit
    #[arg(long)]
    once: bool,

    /// Override scanner.quotes_path
    #[arg(long)]
    quotes: Option<String>,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    config_dump: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(path) = cli.quotes {
        config.scanner.quotes_path = path;
    }

    if cli.config_dump {
        let yaml = serde_yaml::to_string(&config).context("Failed to render configuration")?;
        print!("{yaml}");
        return Ok(());
    }

    init_tracing(&config.logging);
    info!(config = %config, "fairline starting");

    let scanner = Arc::new(Scanner::new(&config));
    let source = Arc::new(CsvQuoteSource::new(&config.scanner.quotes_path));

    if cli.once {
        let report = run_once(source.as_ref(), &scanner).await?;
        let json = serde_json::to_string_pretty(&report.views())
            .context("Failed to serialize opportunities")?;
        println!("{json}");
        return Ok(());
    }

    let store = Arc::new(OpportunityStore::new(
        &config.persistence.data_dir,
        config.persistence.csv_enabled,
        config.persistence.json_snapshot,
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, stopping"),
        }
        let _ = shutdown_tx.send(true);
    });

    let stats = run_refresh_loop(
        source,
        scanner,
        store,
        Duration::from_secs(config.scanner.refresh_secs),
        shutdown_rx,
    )
    .await;

    info!(cycles = stats.cycles, "fairline stopped");
    Ok(())
}
