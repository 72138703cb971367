use crate::calendar::TravelWindow;
use crate::error::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use super::Clock;

/// Append-only log of observed prices, keyed by the exact travel window.
pub struct PriceStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl PriceStore {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Record one price observation, stamped with the current time.
    /// The per-person price is derived by the caller at quote time; the
    /// store never recomputes it.
    pub async fn record_price(
        &self,
        window: &TravelWindow,
        total_price: f64,
        per_person_price: f64,
    ) -> Result<()> {
        let checked_at = self.clock.now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO prices (depart_date, return_date, total_price, per_person_price, checked_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(window.depart.to_string())
        .bind(window.ret.to_string())
        .bind(total_price)
        .bind(per_person_price)
        .bind(&checked_at)
        .execute(&self.pool)
        .await?;

        debug!("Recorded {window}: ${per_person_price:.2}/person at {checked_at}");
        Ok(())
    }

    /// All per-person prices ever observed for this exact window, oldest
    /// first. Empty for an unknown window, never an error.
    pub async fn price_history(&self, window: &TravelWindow) -> Result<Vec<f64>> {
        let prices = sqlx::query_scalar::<_, f64>(
            r#"
            SELECT per_person_price FROM prices
            WHERE depart_date = ? AND return_date = ?
            ORDER BY checked_at
            "#,
        )
        .bind(window.depart.to_string())
        .bind(window.ret.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_clock::FixedClock;
    use crate::tracker::Database;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn test_window() -> TravelWindow {
        TravelWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
        )
    }

    async fn store_with_clock(clock: Arc<FixedClock>) -> PriceStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.price_store(clock)
    }

    #[tokio::test]
    async fn record_then_history_round_trips() {
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap(),
        ));
        let store = store_with_clock(clock.clone()).await;
        let w = test_window();

        store.record_price(&w, 1200.0, 300.0).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2025, 12, 2, 9, 0, 0).unwrap());
        store.record_price(&w, 900.0, 225.0).await.unwrap();

        let history = store.price_history(&w).await.unwrap();
        assert_eq!(history, vec![300.0, 225.0]);
    }

    #[tokio::test]
    async fn unknown_window_has_empty_history() {
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap(),
        ));
        let store = store_with_clock(clock).await;

        let history = store.price_history(&test_window()).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn histories_are_keyed_by_exact_window() {
        let clock = Arc::new(FixedClock::at(
            Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap(),
        ));
        let store = store_with_clock(clock).await;
        let w = test_window();
        let other = TravelWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        );

        store.record_price(&w, 1200.0, 300.0).await.unwrap();

        assert_eq!(store.price_history(&w).await.unwrap().len(), 1);
        assert!(store.price_history(&other).await.unwrap().is_empty());
    }
}
