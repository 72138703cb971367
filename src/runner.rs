use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::calendar::TravelWindow;
use crate::evaluator::DealEvaluator;
use crate::flight_search::client::cheapest;
use crate::flight_search::{FlightQuote, FlightSearchClient};
use crate::monitoring::EmailNotifier;
use crate::tracker::{AlertLedger, PriceStore};

/// Source of priced itineraries for a travel window.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn search_flights(&self, window: &TravelWindow) -> Result<Vec<FlightQuote>>;
}

#[async_trait]
impl QuoteSource for FlightSearchClient {
    async fn search_flights(&self, window: &TravelWindow) -> Result<Vec<FlightQuote>> {
        Ok(FlightSearchClient::search_flights(self, window).await?)
    }
}

/// Outbound alert channel. Implementations report failure so the caller
/// knows not to mark the ledger.
#[async_trait]
pub trait DealNotifier: Send + Sync {
    async fn send_deal_alert(
        &self,
        window: &TravelWindow,
        per_person_price: f64,
        total_price: f64,
        reason: &str,
    ) -> Result<()>;
}

#[async_trait]
impl DealNotifier for EmailNotifier {
    async fn send_deal_alert(
        &self,
        window: &TravelWindow,
        per_person_price: f64,
        total_price: f64,
        reason: &str,
    ) -> Result<()> {
        EmailNotifier::send_deal_alert(self, window, per_person_price, total_price, reason).await
    }
}

/// Drives one daily run: per window, fetch the cheapest quote, record it,
/// check the deal rules, and alert with daily dedup.
pub struct DealRunner {
    source: Box<dyn QuoteSource>,
    notifier: Box<dyn DealNotifier>,
    store: PriceStore,
    ledger: AlertLedger,
    evaluator: DealEvaluator,
    dry_run: bool,
}

impl DealRunner {
    pub fn new(
        source: Box<dyn QuoteSource>,
        notifier: Box<dyn DealNotifier>,
        store: PriceStore,
        ledger: AlertLedger,
        evaluator: DealEvaluator,
        dry_run: bool,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            ledger,
            evaluator,
            dry_run,
        }
    }

    /// Check every window in order. A failure in one window is logged and
    /// never aborts the rest of the run.
    pub async fn run(&self, windows: &[TravelWindow]) {
        for window in windows {
            if let Err(e) = self.check_window(window).await {
                error!("Check failed for {window}: {e:#}");
            }
        }
    }

    async fn check_window(&self, window: &TravelWindow) -> Result<()> {
        let quotes = match self.source.search_flights(window).await {
            Ok(quotes) => quotes,
            Err(e) => {
                // Source errors and empty results are both "no data today".
                error!("Flight search failed for {window}: {e:#}");
                return Ok(());
            }
        };

        let Some(best) = cheapest(&quotes) else {
            info!("No results for {window}");
            return Ok(());
        };
        let per_person = best.per_person_price;
        let total = best.total_price;

        // Snapshot the history before recording: the new observation is
        // evaluated against prior prices only, never against itself.
        let history = self.store.price_history(window).await?;
        self.store.record_price(window, total, per_person).await?;
        info!("{window}: cheapest ${per_person:.0}/person (${total:.0} total)");

        let verdict = self.evaluator.evaluate(per_person, &history);
        if !verdict.is_deal {
            return Ok(());
        }

        if self.ledger.already_alerted_today(window).await? {
            info!("Deal detected but already alerted today - skipping");
            return Ok(());
        }

        info!("DEAL FOUND: {}", verdict.reason);
        if self.dry_run {
            info!("Dry run - alert not dispatched");
            return Ok(());
        }

        // Mark only after a successful dispatch, so a failed send can be
        // retried by a later run the same day.
        self.notifier
            .send_deal_alert(window, per_person, total, &verdict.reason)
            .await?;
        self.ledger.mark_alerted(window, per_person).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_clock::FixedClock;
    use crate::tracker::{Clock, Database};
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    fn window(depart_day: u32) -> TravelWindow {
        TravelWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, depart_day).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, depart_day + 7).unwrap(),
        )
    }

    fn quote(total: f64) -> FlightQuote {
        FlightQuote {
            total_price: total,
            per_person_price: total / 4.0,
            airline: "Delta".to_string(),
            departure_time: String::new(),
            arrival_time: String::new(),
            duration_min: 170,
        }
    }

    struct FakeSource {
        quotes: HashMap<TravelWindow, Vec<FlightQuote>>,
        failing: Vec<TravelWindow>,
    }

    impl FakeSource {
        fn with(window: TravelWindow, quotes: Vec<FlightQuote>) -> Self {
            Self {
                quotes: HashMap::from([(window, quotes)]),
                failing: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn search_flights(&self, window: &TravelWindow) -> Result<Vec<FlightQuote>> {
            if self.failing.contains(window) {
                anyhow::bail!("search provider is down");
            }
            Ok(self.quotes.get(window).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: AtomicU32,
        fail: AtomicBool,
    }

    #[async_trait]
    impl DealNotifier for FakeNotifier {
        async fn send_deal_alert(
            &self,
            _window: &TravelWindow,
            _per_person_price: f64,
            _total_price: f64,
            _reason: &str,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("SMTP handshake failed");
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        db: Database,
        clock: Arc<FixedClock>,
        notifier: Arc<FakeNotifier>,
    }

    impl Harness {
        async fn new() -> Self {
            Self {
                db: Database::connect("sqlite::memory:").await.unwrap(),
                clock: Arc::new(FixedClock::at(
                    Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap(),
                )),
                notifier: Arc::new(FakeNotifier::default()),
            }
        }

        fn runner(&self, source: FakeSource) -> DealRunner {
            let clock = self.clock.clone() as Arc<dyn Clock>;
            DealRunner::new(
                Box::new(source),
                Box::new(SharedNotifier(self.notifier.clone())),
                self.db.price_store(clock.clone()),
                self.db.alert_ledger(clock),
                DealEvaluator::new(250.0, 0.15, 7),
                false,
            )
        }

        async fn seed_history(&self, window: &TravelWindow, prices: &[f64]) {
            let store = self.db.price_store(self.clock.clone() as Arc<dyn Clock>);
            for &p in prices {
                store.record_price(window, p * 4.0, p).await.unwrap();
            }
        }

        async fn history(&self, window: &TravelWindow) -> Vec<f64> {
            self.db
                .price_store(self.clock.clone() as Arc<dyn Clock>)
                .price_history(window)
                .await
                .unwrap()
        }

        async fn alerted_today(&self, window: &TravelWindow) -> bool {
            self.db
                .alert_ledger(self.clock.clone() as Arc<dyn Clock>)
                .already_alerted_today(window)
                .await
                .unwrap()
        }
    }

    // Lets a test keep a handle on the notifier the runner owns.
    struct SharedNotifier(Arc<FakeNotifier>);

    #[async_trait]
    impl DealNotifier for SharedNotifier {
        async fn send_deal_alert(
            &self,
            window: &TravelWindow,
            per_person_price: f64,
            total_price: f64,
            reason: &str,
        ) -> Result<()> {
            self.0
                .send_deal_alert(window, per_person_price, total_price, reason)
                .await
        }
    }

    #[tokio::test]
    async fn first_observation_is_recorded_but_not_a_deal() {
        let h = Harness::new().await;
        let w = window(6);
        // $1000 total, 4 passengers: $250/person, exactly at the absolute
        // threshold, and no history yet for the relative rule.
        let runner = h.runner(FakeSource::with(w, vec![quote(1000.0)]));

        runner.run(&[w]).await;

        assert_eq!(h.history(&w).await, vec![250.0]);
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 0);
        assert!(!h.alerted_today(&w).await);
    }

    #[tokio::test]
    async fn relative_deal_alerts_once_per_day() {
        let h = Harness::new().await;
        let w = window(6);
        h.seed_history(&w, &[300.0; 7]).await;
        let runner = h.runner(FakeSource::with(w, vec![quote(1000.0)]));

        runner.run(&[w]).await;
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);
        assert!(h.alerted_today(&w).await);

        // Second run the same day, same price: deal again, but deduped.
        runner.run(&[w]).await;
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cheapest_quote_is_the_one_recorded() {
        let h = Harness::new().await;
        let w = window(6);
        let runner = h.runner(FakeSource::with(
            w,
            vec![quote(1400.0), quote(1160.0), quote(1300.0)],
        ));

        runner.run(&[w]).await;

        assert_eq!(h.history(&w).await, vec![290.0]);
    }

    #[tokio::test]
    async fn empty_results_record_nothing() {
        let h = Harness::new().await;
        let w = window(6);
        let runner = h.runner(FakeSource::with(w, vec![]));

        runner.run(&[w]).await;

        assert!(h.history(&w).await.is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_the_ledger_unmarked() {
        let h = Harness::new().await;
        let w = window(6);
        h.seed_history(&w, &[300.0; 7]).await;
        h.notifier.fail.store(true, Ordering::SeqCst);
        let runner = h.runner(FakeSource::with(w, vec![quote(1000.0)]));

        runner.run(&[w]).await;
        assert!(!h.alerted_today(&w).await);

        // The SMTP outage clears; a later run the same day retries and marks.
        h.notifier.fail.store(false, Ordering::SeqCst);
        let runner = h.runner(FakeSource::with(w, vec![quote(1000.0)]));
        runner.run(&[w]).await;
        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 1);
        assert!(h.alerted_today(&w).await);
    }

    #[tokio::test]
    async fn one_failing_window_does_not_abort_the_rest() {
        let h = Harness::new().await;
        let broken = window(6);
        let healthy = window(20);
        let mut source = FakeSource::with(healthy, vec![quote(1160.0)]);
        source.failing.push(broken);
        let runner = h.runner(source);

        runner.run(&[broken, healthy]).await;

        assert!(h.history(&broken).await.is_empty());
        assert_eq!(h.history(&healthy).await, vec![290.0]);
    }

    #[tokio::test]
    async fn dry_run_detects_but_never_dispatches() {
        let h = Harness::new().await;
        let w = window(6);
        h.seed_history(&w, &[300.0; 7]).await;
        let clock = h.clock.clone() as Arc<dyn Clock>;
        let runner = DealRunner::new(
            Box::new(FakeSource::with(w, vec![quote(1000.0)])),
            Box::new(SharedNotifier(h.notifier.clone())),
            h.db.price_store(clock.clone()),
            h.db.alert_ledger(clock),
            DealEvaluator::new(250.0, 0.15, 7),
            true,
        );

        runner.run(&[w]).await;

        assert_eq!(h.notifier.sent.load(Ordering::SeqCst), 0);
        assert!(!h.alerted_today(&w).await);
        // The observation is still recorded.
        assert_eq!(h.history(&w).await.len(), 8);
    }
}
