//! SqliteSnapshotStore
//! --------------------
//! SQLite-backed implementation of the `SnapshotStore` trait. It is
//! responsible for durable persistence of the intraday series and the
//! per-day rollup so that:
//!
//!  - signal history survives restarts
//!  - "previous snapshot" lookups stay consistent across processes
//!  - retention cleanup bounds the intraday table
//!  - daily summaries accumulate indefinitely
//!
//! Timestamps are stored as epoch milliseconds of the naive wall-clock
//! value; the conversion is symmetric, so no timezone math is applied.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use chain::aggregate::StrikeEntry;
use chain::underlying::Underlying;

use super::SnapshotStore;
use crate::model::{DailySummary, Snapshot};

/// SQLite persistence backend for snapshots and daily summaries.
///
/// Provides:
///   - schema creation on startup
///   - append-only snapshot inserts
///   - windowed reads (latest / latest-before / intraday / history)
///   - retention deletes
///   - insert-or-replace daily rollups
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect and ensure the schema exists.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables if they do not exist.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                underlying TEXT NOT NULL,
                ts_ms INTEGER NOT NULL,
                expiry_date TEXT NOT NULL,

                total_call_oi INTEGER NOT NULL,
                total_put_oi INTEGER NOT NULL,
                call_oi_change INTEGER NOT NULL,
                put_oi_change INTEGER NOT NULL,

                pcr REAL NOT NULL,
                pcr_change REAL NOT NULL,

                spot_price REAL NOT NULL,
                price_change REAL NOT NULL,
                price_change_pct REAL NOT NULL,

                signal TEXT NOT NULL,
                signal_strength TEXT NOT NULL,

                max_pain_strike REAL NOT NULL,
                highest_call_oi_strike REAL NOT NULL,
                highest_put_oi_strike REAL NOT NULL,

                strikes_json TEXT NOT NULL,

                PRIMARY KEY (underlying, ts_ms)
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_summaries (
                trade_date TEXT NOT NULL,
                underlying TEXT NOT NULL,
                expiry_date TEXT NOT NULL,

                opening_call_oi INTEGER NOT NULL,
                opening_put_oi INTEGER NOT NULL,
                opening_pcr REAL NOT NULL,
                opening_spot REAL NOT NULL,

                closing_call_oi INTEGER NOT NULL,
                closing_put_oi INTEGER NOT NULL,
                closing_pcr REAL NOT NULL,
                closing_spot REAL NOT NULL,

                call_oi_day_change INTEGER NOT NULL,
                put_oi_day_change INTEGER NOT NULL,
                pcr_day_change REAL NOT NULL,
                spot_day_change REAL NOT NULL,
                spot_day_change_pct REAL NOT NULL,

                max_pain_strike REAL NOT NULL,
                highest_call_oi_strike REAL NOT NULL,
                highest_put_oi_strike REAL NOT NULL,

                dominant_signal TEXT NOT NULL,

                PRIMARY KEY (trade_date, underlying)
            );
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn ts_to_ms(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

fn ms_to_ts(ms: i64) -> anyhow::Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", ms))
}

fn date_to_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn snapshot_from_row(row: &SqliteRow) -> anyhow::Result<Snapshot> {
    let underlying_str: String = row.get("underlying");
    let underlying: Underlying = underlying_str.parse()?;

    let ts = ms_to_ts(row.get::<i64, _>("ts_ms"))?;

    let expiry_str: String = row.get("expiry_date");
    let expiry_date: NaiveDate = expiry_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid expiry date '{}': {}", expiry_str, e))?;

    let signal_str: String = row.get("signal");
    let strength_str: String = row.get("signal_strength");

    let strikes_json: String = row.get("strikes_json");
    let strikes: Vec<StrikeEntry> = serde_json::from_str(&strikes_json)
        .map_err(|e| anyhow::anyhow!("Invalid strike breakdown JSON: {}", e))?;

    Ok(Snapshot {
        ts,
        underlying,
        expiry_date,
        total_call_oi: row.get("total_call_oi"),
        total_put_oi: row.get("total_put_oi"),
        call_oi_change: row.get("call_oi_change"),
        put_oi_change: row.get("put_oi_change"),
        pcr: row.get("pcr"),
        pcr_change: row.get("pcr_change"),
        spot_price: row.get("spot_price"),
        price_change: row.get("price_change"),
        price_change_pct: row.get("price_change_pct"),
        signal: signal_str.parse()?,
        signal_strength: strength_str.parse()?,
        max_pain_strike: row.get("max_pain_strike"),
        highest_call_oi_strike: row.get("highest_call_oi_strike"),
        highest_put_oi_strike: row.get("highest_put_oi_strike"),
        strikes,
    })
}

fn summary_from_row(row: &SqliteRow) -> anyhow::Result<DailySummary> {
    let underlying_str: String = row.get("underlying");
    let trade_date_str: String = row.get("trade_date");
    let expiry_str: String = row.get("expiry_date");
    let signal_str: String = row.get("dominant_signal");

    Ok(DailySummary {
        trade_date: trade_date_str
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid trade date '{}': {}", trade_date_str, e))?,
        underlying: underlying_str.parse()?,
        expiry_date: expiry_str
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid expiry date '{}': {}", expiry_str, e))?,
        opening_call_oi: row.get("opening_call_oi"),
        opening_put_oi: row.get("opening_put_oi"),
        opening_pcr: row.get("opening_pcr"),
        opening_spot: row.get("opening_spot"),
        closing_call_oi: row.get("closing_call_oi"),
        closing_put_oi: row.get("closing_put_oi"),
        closing_pcr: row.get("closing_pcr"),
        closing_spot: row.get("closing_spot"),
        call_oi_day_change: row.get("call_oi_day_change"),
        put_oi_day_change: row.get("put_oi_day_change"),
        pcr_day_change: row.get("pcr_day_change"),
        spot_day_change: row.get("spot_day_change"),
        spot_day_change_pct: row.get("spot_day_change_pct"),
        max_pain_strike: row.get("max_pain_strike"),
        highest_call_oi_strike: row.get("highest_call_oi_strike"),
        highest_put_oi_strike: row.get("highest_put_oi_strike"),
        dominant_signal: signal_str.parse()?,
    })
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn insert(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let strikes_json = serde_json::to_string(&snapshot.strikes)?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (
                underlying, ts_ms, expiry_date,
                total_call_oi, total_put_oi,
                call_oi_change, put_oi_change,
                pcr, pcr_change,
                spot_price, price_change, price_change_pct,
                signal, signal_strength,
                max_pain_strike, highest_call_oi_strike, highest_put_oi_strike,
                strikes_json
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
        "#,
        )
        .bind(snapshot.underlying.to_string())
        .bind(ts_to_ms(snapshot.ts))
        .bind(date_to_str(snapshot.expiry_date))
        .bind(snapshot.total_call_oi)
        .bind(snapshot.total_put_oi)
        .bind(snapshot.call_oi_change)
        .bind(snapshot.put_oi_change)
        .bind(snapshot.pcr)
        .bind(snapshot.pcr_change)
        .bind(snapshot.spot_price)
        .bind(snapshot.price_change)
        .bind(snapshot.price_change_pct)
        .bind(snapshot.signal.to_string())
        .bind(snapshot.signal_strength.to_string())
        .bind(snapshot.max_pain_strike)
        .bind(snapshot.highest_call_oi_strike)
        .bind(snapshot.highest_put_oi_strike)
        .bind(strikes_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest(&self, underlying: Underlying) -> anyhow::Result<Option<Snapshot>> {
        let row = sqlx::query(
            "SELECT * FROM snapshots WHERE underlying = ? ORDER BY ts_ms DESC LIMIT 1",
        )
        .bind(underlying.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn latest_before(
        &self,
        underlying: Underlying,
        ts: NaiveDateTime,
    ) -> anyhow::Result<Option<Snapshot>> {
        let row = sqlx::query(
            "SELECT * FROM snapshots WHERE underlying = ? AND ts_ms < ? \
             ORDER BY ts_ms DESC LIMIT 1",
        )
        .bind(underlying.to_string())
        .bind(ts_to_ms(ts))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn intraday(
        &self,
        underlying: Underlying,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Snapshot>> {
        let day_start = ts_to_ms(date.and_time(NaiveTime::MIN));
        let day_end = ts_to_ms((date + Duration::days(1)).and_time(NaiveTime::MIN));

        let rows = sqlx::query(
            "SELECT * FROM snapshots \
             WHERE underlying = ? AND ts_ms >= ? AND ts_ms < ? \
             ORDER BY ts_ms ASC",
        )
        .bind(underlying.to_string())
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    async fn history(
        &self,
        underlying: Underlying,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<Vec<Snapshot>> {
        let rows = sqlx::query(
            "SELECT * FROM snapshots WHERE underlying = ? \
             ORDER BY ts_ms DESC LIMIT ? OFFSET ?",
        )
        .bind(underlying.to_string())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    async fn cleanup(&self, now: NaiveDateTime, retention_days: u32) -> anyhow::Result<u64> {
        let cutoff = ts_to_ms(now - Duration::days(i64::from(retention_days)));

        let result = sqlx::query("DELETE FROM snapshots WHERE ts_ms < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_daily_summary(
        &self,
        underlying: Underlying,
        date: NaiveDate,
    ) -> anyhow::Result<Option<DailySummary>> {
        let snapshots = self.intraday(underlying, date).await?;

        let Some(summary) = DailySummary::from_day(underlying, date, &snapshots) else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO daily_summaries (
                trade_date, underlying, expiry_date,
                opening_call_oi, opening_put_oi, opening_pcr, opening_spot,
                closing_call_oi, closing_put_oi, closing_pcr, closing_spot,
                call_oi_day_change, put_oi_day_change,
                pcr_day_change, spot_day_change, spot_day_change_pct,
                max_pain_strike, highest_call_oi_strike, highest_put_oi_strike,
                dominant_signal
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trade_date, underlying) DO UPDATE SET
                expiry_date = excluded.expiry_date,
                opening_call_oi = excluded.opening_call_oi,
                opening_put_oi = excluded.opening_put_oi,
                opening_pcr = excluded.opening_pcr,
                opening_spot = excluded.opening_spot,
                closing_call_oi = excluded.closing_call_oi,
                closing_put_oi = excluded.closing_put_oi,
                closing_pcr = excluded.closing_pcr,
                closing_spot = excluded.closing_spot,
                call_oi_day_change = excluded.call_oi_day_change,
                put_oi_day_change = excluded.put_oi_day_change,
                pcr_day_change = excluded.pcr_day_change,
                spot_day_change = excluded.spot_day_change,
                spot_day_change_pct = excluded.spot_day_change_pct,
                max_pain_strike = excluded.max_pain_strike,
                highest_call_oi_strike = excluded.highest_call_oi_strike,
                highest_put_oi_strike = excluded.highest_put_oi_strike,
                dominant_signal = excluded.dominant_signal;
        "#,
        )
        .bind(date_to_str(summary.trade_date))
        .bind(summary.underlying.to_string())
        .bind(date_to_str(summary.expiry_date))
        .bind(summary.opening_call_oi)
        .bind(summary.opening_put_oi)
        .bind(summary.opening_pcr)
        .bind(summary.opening_spot)
        .bind(summary.closing_call_oi)
        .bind(summary.closing_put_oi)
        .bind(summary.closing_pcr)
        .bind(summary.closing_spot)
        .bind(summary.call_oi_day_change)
        .bind(summary.put_oi_day_change)
        .bind(summary.pcr_day_change)
        .bind(summary.spot_day_change)
        .bind(summary.spot_day_change_pct)
        .bind(summary.max_pain_strike)
        .bind(summary.highest_call_oi_strike)
        .bind(summary.highest_put_oi_strike)
        .bind(summary.dominant_signal.to_string())
        .execute(&self.pool)
        .await?;

        Ok(Some(summary))
    }

    async fn daily_summaries(
        &self,
        underlying: Underlying,
        limit: u32,
    ) -> anyhow::Result<Vec<DailySummary>> {
        let rows = sqlx::query(
            "SELECT * FROM daily_summaries WHERE underlying = ? \
             ORDER BY trade_date DESC LIMIT ?",
        )
        .bind(underlying.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}
