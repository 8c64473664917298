//! CSV Persistence Module
//!
//! Reads flat quote snapshots into markets and records scan output for the
//! presentation layer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::scanner::{OpportunitySink, QuoteSource, ScanReport};
use crate::types::{AmericanOdds, Market, Opportunity, OpportunityView, Quote};

/// One quote row as it appears in a snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub market_id: String,
    pub description: String,
    pub side_a: String,
    pub side_b: String,
    pub bookmaker: String,
    pub side: String,
    /// American odds, with or without a leading '+'
    pub odds: String,
}

/// Opportunity row for CSV storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub timestamp: i64,
    pub market_id: String,
    pub description: String,
    pub side: String,
    pub book: String,
    pub odds: String,
    pub fair_odds: String,
    pub fair_probability: f64,
    pub anchor_book: String,
    pub anchor_margin: f64,
    pub ev_pct: f64,
    pub class: String,
    #[serde(default)]
    pub posting_odds: Option<String>,
    #[serde(default)]
    pub target_ev: Option<f64>,
    #[serde(default)]
    pub commission_rate: Option<f64>,
}

impl From<&Opportunity> for OpportunityRecord {
    fn from(opp: &Opportunity) -> Self {
        Self {
            timestamp: opp.computed_at.timestamp_millis(),
            market_id: opp.market_id.clone(),
            description: opp.description.clone(),
            side: opp.ev.side.clone(),
            book: opp.ev.best_quote.bookmaker.clone(),
            odds: opp.ev.best_quote.odds.to_string(),
            fair_odds: opp.fair.fair_odds.to_string(),
            fair_probability: opp.fair.fair_probability,
            anchor_book: opp.fair.anchor_book.clone(),
            anchor_margin: opp.fair.margin,
            ev_pct: opp.ev.ev_pct,
            class: opp.ev.class.to_string(),
            posting_odds: opp.posting.map(|p| p.recommended_odds.to_string()),
            target_ev: opp.posting.map(|p| p.target_ev),
            commission_rate: opp.posting.map(|p| p.commission_rate),
        }
    }
}

/// Group quote rows into markets, keeping first-seen market order.
///
/// Rows with unparseable odds, or whose side labels disagree with the first row
/// seen for their market, are skipped.
pub fn markets_from_records(records: impl IntoIterator<Item = QuoteRecord>) -> Vec<Market> {
    let mut markets: Vec<Market> = Vec::new();
    for record in records {
        let odds = match record.odds.parse::<AmericanOdds>() {
            Ok(odds) => odds,
            Err(e) => {
                warn!(
                    market_id = %record.market_id,
                    bookmaker = %record.bookmaker,
                    odds = %record.odds,
                    "skipping quote: {}", e
                );
                continue;
            }
        };

        let market = match markets.iter().position(|m| m.market_id == record.market_id) {
            Some(idx) => &mut markets[idx],
            None => {
                markets.push(Market::new(
                    record.market_id.clone(),
                    record.description.clone(),
                    record.side_a.clone(),
                    record.side_b.clone(),
                ));
                let last = markets.len() - 1;
                &mut markets[last]
            }
        };

        if !market.side_a.eq_ignore_ascii_case(&record.side_a)
            || !market.side_b.eq_ignore_ascii_case(&record.side_b)
        {
            warn!(
                market_id = %record.market_id,
                expected = %format!("{}/{}", market.side_a, market.side_b),
                got = %format!("{}/{}", record.side_a, record.side_b),
                "skipping quote: side labels disagree with market"
            );
            continue;
        }

        market
            .quotes
            .push(Quote::new(record.bookmaker, record.side, odds));
    }
    markets
}

/// Parse a quote snapshot from any reader.
pub fn read_markets<R: Read>(reader: R) -> Result<Vec<Market>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<QuoteRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            // header is line 1
            Err(e) => warn!(line = line + 2, "skipping malformed quote row: {}", e),
        }
    }
    Ok(markets_from_records(records))
}

/// Parse a quote snapshot file.
pub fn read_markets_file(path: &Path) -> Result<Vec<Market>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open quote file {}", path.display()))?;
    read_markets(file)
}

/// Quote source backed by a CSV snapshot that an external job keeps refreshed.
#[derive(Debug, Clone)]
pub struct CsvQuoteSource {
    path: PathBuf,
}

impl CsvQuoteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuoteSource for CsvQuoteSource {
    async fn fetch(&self) -> Result<Vec<Market>> {
        let path = self.path.clone();
        let markets = tokio::task::spawn_blocking(move || read_markets_file(&path))
            .await
            .context("Quote reader task failed")??;
        debug!(path = %self.path.display(), markets = markets.len(), "quotes loaded");
        Ok(markets)
    }
}

/// Writes each scan to `opportunities.csv` and `opportunities_latest.json`.
pub struct OpportunityStore {
    data_dir: PathBuf,
    csv_enabled: bool,
    json_snapshot: bool,
    // serializes appends from concurrent publishers
    write_lock: Mutex<()>,
}

impl OpportunityStore {
    pub const CSV_FILE: &'static str = "opportunities.csv";
    pub const JSON_FILE: &'static str = "opportunities_latest.json";

    pub fn new(data_dir: &str, csv_enabled: bool, json_snapshot: bool) -> Result<Self> {
        let data_dir = PathBuf::from(data_dir);
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        info!(
            data_dir = %data_dir.display(),
            csv_enabled,
            json_snapshot,
            "opportunity store ready"
        );
        Ok(Self {
            data_dir,
            csv_enabled,
            json_snapshot,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn create_writer(dir: &Path, filename: &str) -> Result<csv::Writer<fs::File>> {
        let path = dir.join(filename);
        let file_has_data =
            path.exists() && fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open CSV file")?;

        Ok(WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file))
    }

    pub fn append_csv(&self, opportunities: &[Opportunity]) -> Result<()> {
        if opportunities.is_empty() {
            return Ok(());
        }
        let mut writer = Self::create_writer(&self.data_dir, Self::CSV_FILE)?;
        for opp in opportunities {
            writer
                .serialize(OpportunityRecord::from(opp))
                .context("Failed to write opportunity record")?;
        }
        writer.flush().context("Failed to flush opportunity writer")?;
        Ok(())
    }

    pub fn write_snapshot(&self, views: &[OpportunityView]) -> Result<()> {
        let path = self.data_dir.join(Self::JSON_FILE);
        let tmp = self.data_dir.join(format!("{}.tmp", Self::JSON_FILE));
        let json = serde_json::to_vec_pretty(views).context("Failed to serialize snapshot")?;
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
        Ok(())
    }

    pub fn load_csv(&self) -> Result<Vec<OpportunityRecord>> {
        let path = self.data_dir.join(Self::CSV_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&path).context("Failed to open opportunities CSV")?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut out = Vec::new();
        for row in reader.deserialize() {
            match row {
                Ok(record) => out.push(record),
                Err(e) => warn!("Failed to deserialize opportunity record: {}", e),
            }
        }
        Ok(out)
    }
}

impl OpportunitySink for OpportunityStore {
    fn publish(&self, report: &ScanReport) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("opportunity store lock poisoned"))?;
        if self.csv_enabled {
            self.append_csv(&report.opportunities)?;
        }
        if self.json_snapshot {
            self.write_snapshot(&report.views())?;
        }
        Ok(())
    }
}
