//! Configuration management for Fairline
//!
//! Loads from YAML files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::odds::{EvCalculator, FairOddsEngine, PostingOddsRecommender};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub reference_books: ReferenceBooksConfig,
    pub ev: EvConfig,
    pub posting: PostingConfig,
    pub scanner: ScannerConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (FAIRLINE_*)
            .add_source(
                Environment::with_prefix("FAIRLINE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("reference_books.books")
                    .try_parsing(true),
            );

        let app_config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Built-in defaults only, without files or environment.
    pub fn default_config() -> Result<Self> {
        let config = Self::defaults()?
            .build()
            .context("Failed to build default configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize default configuration")
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            // Reference books
            .set_default("reference_books.books", vec!["pinnacle", "circa", "bookmaker"])?
            .set_default("reference_books.min_books", 2)?
            // EV buckets
            .set_default("ev.excellent_pct", 4.5)?
            .set_default("ev.high_pct", 2.0)?
            .set_default("ev.positive_pct", 0.0)?
            .set_default("ev.neutral_pct", -2.0)?
            // Posting
            .set_default("posting.target_ev", 0.025)?
            .set_default("posting.commission_rate", 0.02)?
            // Scanner
            .set_default("scanner.quotes_path", "./data/quotes.csv")?
            .set_default("scanner.refresh_secs", 60)?
            .set_default("scanner.workers", 4)?
            // Persistence
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?
            .set_default("persistence.json_snapshot", true)?
            // Logging
            .set_default("logging.json", false)?
            .set_default("logging.level", "info")?)
    }

    /// Reject settings the pricing core cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.reference_books.books.iter().all(|b| b.trim().is_empty()) {
            bail!("reference_books.books must name at least one bookmaker");
        }
        if self.reference_books.min_books < 2 {
            bail!(
                "reference_books.min_books must be at least 2 (got {})",
                self.reference_books.min_books
            );
        }
        if !self.ev.thresholds().is_ordered() {
            bail!(
                "ev thresholds must be strictly descending (excellent > high > positive > neutral)"
            );
        }
        if !(0.0..1.0).contains(&self.posting.commission_rate) {
            bail!(
                "posting.commission_rate must be in [0, 1) (got {})",
                self.posting.commission_rate
            );
        }
        if self.posting.target_ev <= -1.0 {
            bail!(
                "posting.target_ev must be greater than -1 (got {})",
                self.posting.target_ev
            );
        }
        if self.scanner.refresh_secs == 0 {
            bail!("scanner.refresh_secs must be positive");
        }
        if self.scanner.workers == 0 {
            bail!("scanner.workers must be positive");
        }
        Ok(())
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "books={:?} min_books={} ev=[{:.1}/{:.1}/{:.1}/{:.1}] target_ev={:.3} commission={:.3} refresh={}s",
            self.reference_books.books,
            self.reference_books.min_books,
            self.ev.excellent_pct,
            self.ev.high_pct,
            self.ev.positive_pct,
            self.ev.neutral_pct,
            self.posting.target_ev,
            self.posting.commission_rate,
            self.scanner.refresh_secs,
        )
    }

    pub fn fair_odds_engine(&self) -> FairOddsEngine {
        FairOddsEngine::new(
            self.reference_books.books.clone(),
            self.reference_books.min_books,
        )
    }

    pub fn ev_calculator(&self) -> EvCalculator {
        EvCalculator::new(self.ev.thresholds())
    }

    pub fn posting_recommender(&self) -> PostingOddsRecommender {
        PostingOddsRecommender::new(self.posting.target_ev, self.posting.commission_rate)
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
