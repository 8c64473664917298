//! Periodic refresh: pull quotes, scan, publish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{ScanReport, Scanner};
use crate::types::Market;

/// Where quotes come from. Implementations group quotes into markets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Market>>;
}

/// Where scan results go.
#[cfg_attr(test, mockall::automock)]
pub trait OpportunitySink: Send + Sync {
    fn publish(&self, report: &ScanReport) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub cycles: u64,
    pub failed_fetches: u64,
    pub failed_publishes: u64,
}

/// Fetch once and scan.
pub async fn run_once(source: &dyn QuoteSource, scanner: &Arc<Scanner>) -> Result<ScanReport> {
    let markets = source.fetch().await?;
    Ok(scanner.scan_concurrent(markets).await)
}

/// Run refresh cycles every `refresh` until `shutdown` flips to true (or its
/// sender is dropped). A failed fetch or publish is logged and the loop waits
/// for the next tick.
pub async fn run_refresh_loop(
    source: Arc<dyn QuoteSource>,
    scanner: Arc<Scanner>,
    sink: Arc<dyn OpportunitySink>,
    refresh: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> RefreshStats {
    let mut stats = RefreshStats::default();
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(refresh_secs = refresh.as_secs_f64(), "refresh loop started");

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                stats.cycles += 1;
                match run_once(source.as_ref(), &scanner).await {
                    Ok(report) => {
                        if let Err(e) = sink.publish(&report) {
                            stats.failed_publishes += 1;
                            warn!(error = %e, "failed to publish scan report");
                        }
                    }
                    Err(e) => {
                        stats.failed_fetches += 1;
                        warn!(error = %e, "quote fetch failed, retrying next cycle");
                    }
                }
            }
        }
    }

    info!(
        cycles = stats.cycles,
        failed_fetches = stats.failed_fetches,
        failed_publishes = stats.failed_publishes,
        "refresh loop stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::{EvCalculator, FairOddsEngine, PostingOddsRecommender};
    use crate::types::AmericanOdds;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn odds(v: i32) -> AmericanOdds {
        AmericanOdds::new(v).unwrap()
    }

    fn market() -> Market {
        Market::new("m1", "Team total", "over", "under")
            .with_quote("pinnacle", "over", odds(-105))
            .with_quote("pinnacle", "under", odds(-115))
            .with_quote("circa", "over", odds(-108))
            .with_quote("circa", "under", odds(-112))
            .with_quote("betmgm", "over", odds(115))
    }

    fn scanner() -> Arc<Scanner> {
        Arc::new(Scanner::from_parts(
            FairOddsEngine::new(vec!["pinnacle".into(), "circa".into()], 2),
            EvCalculator::default(),
            PostingOddsRecommender::default(),
        ))
    }

    /// Counts publishes and requests shutdown after `stop_after`.
    struct StopAfter {
        seen: Mutex<Vec<usize>>,
        stop_after: usize,
        shutdown: watch::Sender<bool>,
    }

    impl OpportunitySink for StopAfter {
        fn publish(&self, report: &ScanReport) -> Result<()> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(report.opportunities.len());
            if seen.len() >= self.stop_after {
                let _ = self.shutdown.send(true);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_once_scans_fetched_markets() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch().times(1).returning(|| Ok(vec![market()]));

        let report = run_once(&source, &scanner()).await.unwrap();
        assert_eq!(report.markets_priced, 1);
        assert_eq!(report.opportunities[0].ev.best_quote.bookmaker, "betmgm");
    }

    #[tokio::test]
    async fn loop_survives_failed_fetch() {
        let calls = AtomicUsize::new(0);
        let mut source = MockQuoteSource::new();
        source.expect_fetch().returning(move || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow::anyhow!("feed down"))
            } else {
                Ok(vec![market()])
            }
        });

        let (tx, rx) = watch::channel(false);
        let sink = Arc::new(StopAfter {
            seen: Mutex::new(Vec::new()),
            stop_after: 2,
            shutdown: tx,
        });

        let stats = run_refresh_loop(
            Arc::new(source),
            scanner(),
            sink.clone(),
            Duration::from_millis(5),
            rx,
        )
        .await;

        assert_eq!(stats.failed_fetches, 1);
        assert_eq!(stats.cycles, 3);
        assert_eq!(*sink.seen.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn loop_counts_publish_failures() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch().returning(|| Ok(vec![market()]));

        let (tx, rx) = watch::channel(false);
        let publishes = Arc::new(AtomicUsize::new(0));
        let mut sink = MockOpportunitySink::new();
        let counter = publishes.clone();
        sink.expect_publish().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                let _ = tx.send(true);
            }
            Err(anyhow::anyhow!("disk full"))
        });

        let stats = run_refresh_loop(
            Arc::new(source),
            scanner(),
            Arc::new(sink),
            Duration::from_millis(5),
            rx,
        )
        .await;

        assert_eq!(stats.failed_publishes, 2);
        assert_eq!(publishes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_sender_stops_loop() {
        let mut source = MockQuoteSource::new();
        source.expect_fetch().returning(|| Ok(Vec::new()));
        let mut sink = MockOpportunitySink::new();
        sink.expect_publish().returning(|_| Ok(()));

        let (tx, rx) = watch::channel(false);
        drop(tx);

        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            run_refresh_loop(
                Arc::new(source),
                scanner(),
                Arc::new(sink),
                Duration::from_secs(3600),
                rx,
            ),
        )
        .await
        .expect("loop should stop once the sender is gone");

        assert!(stats.cycles <= 1);
    }
}
