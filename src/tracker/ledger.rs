use crate::calendar::TravelWindow;
use crate::error::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use super::Clock;

/// Durable record of alerts already sent, used to cap notifications at one
/// per window per UTC calendar day.
pub struct AlertLedger {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl AlertLedger {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// True iff an alert for this exact window was already sent on the
    /// current UTC day. Queried fresh on every call.
    pub async fn already_alerted_today(&self, window: &TravelWindow) -> Result<bool> {
        // sent_at is RFC 3339, so a UTC date prefix match is a day match.
        let today_prefix = format!("{}%", self.clock.now().date_naive());
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM alerts_sent
            WHERE depart_date = ? AND return_date = ? AND sent_at LIKE ?
            "#,
        )
        .bind(window.depart.to_string())
        .bind(window.ret.to_string())
        .bind(&today_prefix)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Append an alert record. Called only after a dispatch reported success.
    pub async fn mark_alerted(&self, window: &TravelWindow, per_person_price: f64) -> Result<()> {
        let sent_at = self.clock.now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO alerts_sent (depart_date, return_date, per_person_price, sent_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(window.depart.to_string())
        .bind(window.ret.to_string())
        .bind(per_person_price)
        .bind(&sent_at)
        .execute(&self.pool)
        .await?;

        debug!("Marked {window} alerted at {sent_at}");
        Ok(())
    }
}
