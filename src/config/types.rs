//! Configuration section types

use serde::{Deserialize, Serialize};

use crate::odds::EvThresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceBooksConfig {
    /// Sharp books used for fair odds, in tie-break priority order
    pub books: Vec<String>,
    /// Minimum reference books quoting both sides before a market is priced
    pub min_books: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvConfig {
    /// EV% at or above which an opportunity is "excellent"
    pub excellent_pct: f64,
    /// EV% at or above which an opportunity is "high"
    pub high_pct: f64,
    /// EV% at or above which an opportunity is "positive"
    pub positive_pct: f64,
    /// EV% at or above which an opportunity is "neutral"; below is "negative"
    pub neutral_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingConfig {
    /// Target EV for posted exchange odds (0.025 = 2.5%)
    pub target_ev: f64,
    /// Exchange commission rate (0.02 = 2%)
    pub commission_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Flat CSV of quotes to scan
    pub quotes_path: String,
    /// Seconds between refreshes in loop mode
    pub refresh_secs: u64,
    /// Only report opportunities at or above this EV%
    pub min_ev_pct: Option<f64>,
    /// Blocking tasks used to fan out a scan
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Append opportunities to CSV
    pub csv_enabled: bool,
    /// Rewrite the latest opportunities as JSON after each scan
    pub json_snapshot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines
    pub json: bool,
    /// Default filter when RUST_LOG is unset
    pub level: String,
}

impl EvConfig {
    pub fn thresholds(&self) -> EvThresholds {
        EvThresholds {
            excellent_pct: self.excellent_pct,
            high_pct: self.high_pct,
            positive_pct: self.positive_pct,
            neutral_pct: self.neutral_pct,
        }
    }
}
