//! Batch pipeline: markets in, enriched opportunities out.
//!
//! A market that fails any pricing step is dropped from the report and tallied
//! by error kind; it never stops the rest of the batch.

pub mod refresh;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::{OddsError, OddsResult};
use crate::odds::{best_quote, EvCalculator, FairOddsEngine, PostingOddsRecommender};
use crate::types::{Market, MarketSide, Opportunity, OpportunityView};

pub use refresh::{run_refresh_loop, OpportunitySink, QuoteSource};

/// Outcome of one scan over a batch of markets.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Sorted by EV, best first
    pub opportunities: Vec<Opportunity>,
    pub markets_seen: usize,
    pub markets_priced: usize,
    /// Markets dropped, keyed by error kind
    pub skipped: BTreeMap<&'static str, usize>,
    /// Opportunities reported without a posting recommendation
    pub posting_omitted: usize,
    pub computed_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn views(&self) -> Vec<OpportunityView> {
        self.opportunities.iter().map(OpportunityView::from).collect()
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Debug, Default)]
struct Partial {
    opportunities: Vec<Opportunity>,
    markets_seen: usize,
    markets_priced: usize,
    skipped: BTreeMap<&'static str, usize>,
    posting_omitted: usize,
}

impl Partial {
    /// Fold in a worker's result. A failed worker counts every market of its
    /// chunk as seen and skipped.
    fn absorb(&mut self, chunk_len: usize, outcome: Result<Partial, JoinError>) {
        match outcome {
            Ok(partial) => self.merge(partial),
            Err(e) => {
                error!(error = %e, markets = chunk_len, "scan worker failed");
                self.markets_seen += chunk_len;
                *self.skipped.entry("worker_failed").or_default() += chunk_len;
            }
        }
    }

    fn merge(&mut self, other: Partial) {
        self.opportunities.extend(other.opportunities);
        self.markets_seen += other.markets_seen;
        self.markets_priced += other.markets_priced;
        for (kind, n) in other.skipped {
            *self.skipped.entry(kind).or_default() += n;
        }
        self.posting_omitted += other.posting_omitted;
    }
}

#[derive(Debug, Clone)]
pub struct Scanner {
    engine: FairOddsEngine,
    ev: EvCalculator,
    posting: PostingOddsRecommender,
    min_ev_pct: Option<f64>,
    workers: usize,
}

impl Scanner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            engine: config.fair_odds_engine(),
            ev: config.ev_calculator(),
            posting: config.posting_recommender(),
            min_ev_pct: config.scanner.min_ev_pct,
            workers: config.scanner.workers.max(1),
        }
    }

    pub fn from_parts(
        engine: FairOddsEngine,
        ev: EvCalculator,
        posting: PostingOddsRecommender,
    ) -> Self {
        Self {
            engine,
            ev,
            posting,
            min_ev_pct: None,
            workers: 1,
        }
    }

    pub fn with_min_ev_pct(mut self, min_ev_pct: Option<f64>) -> Self {
        self.min_ev_pct = min_ev_pct;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Price both sides of one market.
    ///
    /// The returned vector has one entry per side that has at least one quote.
    /// An unachievable posting target only drops the posting recommendation.
    pub fn evaluate_market(&self, market: &Market) -> OddsResult<Vec<Opportunity>> {
        let pairs = market.pairs();
        let fair = self.engine.fair_prices(&pairs)?;
        let computed_at = Utc::now();

        let mut out = Vec::with_capacity(2);
        for side in [MarketSide::A, MarketSide::B] {
            let fair_price = fair.side(side);
            let Some(best) = best_quote(market.quotes_for(side)) else {
                continue;
            };
            let ev = self.ev.evaluate(fair_price, best)?;
            let posting = match self.posting.recommend(fair_price) {
                Ok(rec) => Some(rec),
                Err(e) => {
                    debug!(
                        market_id = %market.market_id,
                        side = market.side_label(side),
                        reason = e.kind(),
                        "posting recommendation omitted"
                    );
                    None
                }
            };
            out.push(Opportunity {
                market_id: market.market_id.clone(),
                description: market.description.clone(),
                fair: fair_price.clone(),
                ev,
                posting,
                computed_at,
            });
        }
        Ok(out)
    }

    fn collect(&self, markets: &[Market]) -> Partial {
        let mut partial = Partial::default();
        for market in markets {
            partial.markets_seen += 1;
            match self.evaluate_market(market) {
                Ok(opps) => {
                    partial.markets_priced += 1;
                    partial.posting_omitted += opps.iter().filter(|o| o.posting.is_none()).count();
                    partial.opportunities.extend(opps);
                }
                Err(e) => {
                    log_skip(market, &e);
                    *partial.skipped.entry(e.kind()).or_default() += 1;
                }
            }
        }
        partial
    }

    fn finish(&self, mut partial: Partial) -> ScanReport {
        if let Some(floor) = self.min_ev_pct {
            partial.opportunities.retain(|o| o.ev.ev_pct >= floor);
        }
        partial
            .opportunities
            .sort_by(|a, b| b.ev.ev_pct.total_cmp(&a.ev.ev_pct));

        let report = ScanReport {
            opportunities: partial.opportunities,
            markets_seen: partial.markets_seen,
            markets_priced: partial.markets_priced,
            skipped: partial.skipped,
            posting_omitted: partial.posting_omitted,
            computed_at: Utc::now(),
        };

        info!(
            markets = report.markets_seen,
            priced = report.markets_priced,
            opportunities = report.opportunities.len(),
            skipped = report.skipped_total(),
            posting_omitted = report.posting_omitted,
            "scan complete"
        );
        report
    }

    /// Scan a batch on the current thread.
    pub fn scan(&self, markets: &[Market]) -> ScanReport {
        let partial = self.collect(markets);
        self.finish(partial)
    }

    /// Scan a batch fanned out over `workers` blocking tasks.
    pub async fn scan_concurrent(self: &Arc<Self>, markets: Vec<Market>) -> ScanReport {
        if markets.is_empty() || self.workers == 1 {
            return self.scan(&markets);
        }

        let chunk_size = markets.len().div_ceil(self.workers);
        let mut handles = Vec::with_capacity(self.workers);
        let mut iter = markets.into_iter().peekable();
        while iter.peek().is_some() {
            let chunk: Vec<Market> = iter.by_ref().take(chunk_size).collect();
            let len = chunk.len();
            let scanner = Arc::clone(self);
            handles.push((
                len,
                tokio::task::spawn_blocking(move || scanner.collect(&chunk)),
            ));
        }

        let mut merged = Partial::default();
        for (len, handle) in handles {
            merged.absorb(len, handle.await);
        }
        self.finish(merged)
    }
}

fn log_skip(market: &Market, err: &OddsError) {
    match err {
        OddsError::InsufficientMarketDepth { .. } => debug!(
            market_id = %market.market_id,
            reason = err.kind(),
            "market excluded: {}", err
        ),
        _ => warn!(
            market_id = %market.market_id,
            reason = err.kind(),
            "market skipped: {}", err
        ),
    }
}
