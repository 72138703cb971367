//! SQLite-backed price history and alert ledger.

pub mod ledger;
pub mod store;

pub use ledger::AlertLedger;
pub use store::PriceStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// Time source for observation and alert timestamps. Injected so tests can
/// pin "today" and roll it over the UTC day boundary.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared SQLite pool. The database is the source of truth across runs;
/// both relations are append-only.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the SQLite database at the given URL, creating it (and the
    /// schema) if missing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                depart_date TEXT NOT NULL,
                return_date TEXT NOT NULL,
                total_price REAL NOT NULL,
                per_person_price REAL NOT NULL,
                checked_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_prices_window
            ON prices(depart_date, return_date, checked_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts_sent (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                depart_date TEXT NOT NULL,
                return_date TEXT NOT NULL,
                per_person_price REAL NOT NULL,
                sent_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_alerts_window
            ON alerts_sent(depart_date, return_date, sent_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn price_store(&self, clock: Arc<dyn Clock>) -> PriceStore {
        PriceStore::new(self.pool.clone(), clock)
    }

    pub fn alert_ledger(&self, clock: Arc<dyn Clock>) -> AlertLedger {
        AlertLedger::new(self.pool.clone(), clock)
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::Clock;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// Clock pinned to an explicit instant, adjustable mid-test.
    pub struct FixedClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        pub fn at(now: DateTime<Utc>) -> Self {
            Self { now: Mutex::new(now) }
        }

        pub fn set(&self, now: DateTime<Utc>) {
            *self.now.lock().unwrap() = now;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
