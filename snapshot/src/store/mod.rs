pub mod sqlite_store;

use chrono::{NaiveDate, NaiveDateTime};

use chain::underlying::Underlying;

use crate::model::{DailySummary, Snapshot};

/// Persistence seam for snapshots and daily rollups.
///
/// Writers (`insert`, `upsert_daily_summary`, `cleanup`) must be atomic from
/// the caller's perspective; readers never observe a partial row.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Persist one finished snapshot. Snapshots are immutable; writing two
    /// with the same (underlying, timestamp) is a caller bug.
    async fn insert(&self, snapshot: &Snapshot) -> anyhow::Result<()>;

    /// Most recent snapshot for the underlying, if any.
    async fn latest(&self, underlying: Underlying) -> anyhow::Result<Option<Snapshot>>;

    /// Most recent snapshot strictly before `ts` — the "previous snapshot"
    /// seam the signal classifier depends on.
    async fn latest_before(
        &self,
        underlying: Underlying,
        ts: NaiveDateTime,
    ) -> anyhow::Result<Option<Snapshot>>;

    /// All snapshots of one trading day, ascending by timestamp.
    async fn intraday(
        &self,
        underlying: Underlying,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<Snapshot>>;

    /// Paged history, descending by timestamp.
    async fn history(
        &self,
        underlying: Underlying,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<Vec<Snapshot>>;

    /// Delete snapshots older than `retention_days` before `now`, across all
    /// underlyings. Returns the number of rows removed.
    async fn cleanup(&self, now: NaiveDateTime, retention_days: u32) -> anyhow::Result<u64>;

    /// Roll the day's snapshots into the single summary row for
    /// (date, underlying), insert-or-replace. A day without snapshots is a
    /// no-op returning `None` — never an empty-valued row.
    async fn upsert_daily_summary(
        &self,
        underlying: Underlying,
        date: NaiveDate,
    ) -> anyhow::Result<Option<DailySummary>>;

    /// Most recent daily summaries, descending by trade date.
    async fn daily_summaries(
        &self,
        underlying: Underlying,
        limit: u32,
    ) -> anyhow::Result<Vec<DailySummary>>;
}
