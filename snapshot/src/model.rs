use chrono::{NaiveDate, NaiveDateTime};

use chain::aggregate::{ChainMetrics, StrikeEntry};
use chain::signal::{self, Signal, SignalStrength};
use chain::underlying::Underlying;

/// One point-in-time reading of an underlying's option chain.
///
/// Immutable once inserted. Every `*_change` field is vs. the most recent
/// prior snapshot of the *same* underlying (zero for the first of a series),
/// never across underlyings.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub ts: NaiveDateTime,
    pub underlying: Underlying,
    pub expiry_date: NaiveDate,

    pub total_call_oi: i64,
    pub total_put_oi: i64,
    pub call_oi_change: i64,
    pub put_oi_change: i64,

    pub pcr: f64,
    pub pcr_change: f64,

    pub spot_price: f64,
    pub price_change: f64,
    pub price_change_pct: f64,

    pub signal: Signal,
    pub signal_strength: SignalStrength,

    pub max_pain_strike: f64,
    pub highest_call_oi_strike: f64,
    pub highest_put_oi_strike: f64,

    /// Ascending per-strike breakdown, one entry per grid strike.
    pub strikes: Vec<StrikeEntry>,
}

impl Snapshot {
    /// Build the snapshot for one aggregated chain, deriving every delta and
    /// the signal from `previous` — the most recent prior snapshot of the
    /// same underlying, if any.
    pub fn from_metrics(
        ts: NaiveDateTime,
        metrics: &ChainMetrics,
        previous: Option<&Snapshot>,
    ) -> Snapshot {
        let (call_oi_change, put_oi_change, pcr_change, price_change) = match previous {
            Some(prev) => (
                metrics.total_call_oi - prev.total_call_oi,
                metrics.total_put_oi - prev.total_put_oi,
                metrics.pcr - prev.pcr,
                metrics.spot_price - prev.spot_price,
            ),
            None => (0, 0, 0.0, 0.0),
        };

        let price_change_pct = match previous {
            Some(prev) if prev.spot_price != 0.0 => price_change / prev.spot_price * 100.0,
            _ => 0.0,
        };

        let total_oi_change = call_oi_change + put_oi_change;

        Snapshot {
            ts,
            underlying: metrics.underlying,
            expiry_date: metrics.expiry,
            total_call_oi: metrics.total_call_oi,
            total_put_oi: metrics.total_put_oi,
            call_oi_change,
            put_oi_change,
            pcr: metrics.pcr,
            pcr_change,
            spot_price: metrics.spot_price,
            price_change,
            price_change_pct,
            signal: signal::classify(price_change, total_oi_change),
            signal_strength: signal::strength_from_pcr(metrics.pcr),
            max_pain_strike: metrics.max_pain_strike,
            highest_call_oi_strike: metrics.highest_call_oi_strike,
            highest_put_oi_strike: metrics.highest_put_oi_strike,
            strikes: metrics.strikes.clone(),
        }
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.ts.date()
    }
}

/// One row per underlying per trading day. Overwritten idempotently at
/// end-of-day, never deleted, and only ever derived from that day's
/// snapshots — never recomputed from raw market data.
#[derive(Debug, Clone)]
pub struct DailySummary {
    pub trade_date: NaiveDate,
    pub underlying: Underlying,
    pub expiry_date: NaiveDate,

    pub opening_call_oi: i64,
    pub opening_put_oi: i64,
    pub opening_pcr: f64,
    pub opening_spot: f64,

    pub closing_call_oi: i64,
    pub closing_put_oi: i64,
    pub closing_pcr: f64,
    pub closing_spot: f64,

    pub call_oi_day_change: i64,
    pub put_oi_day_change: i64,
    pub pcr_day_change: f64,
    pub spot_day_change: f64,
    pub spot_day_change_pct: f64,

    pub max_pain_strike: f64,
    pub highest_call_oi_strike: f64,
    pub highest_put_oi_strike: f64,

    pub dominant_signal: Signal,
}

impl DailySummary {
    /// Roll one day of snapshots (ascending by timestamp) into a summary.
    ///
    /// Returns `None` for an empty day: absence of data never produces a
    /// row.
    pub fn from_day(
        underlying: Underlying,
        trade_date: NaiveDate,
        snapshots: &[Snapshot],
    ) -> Option<DailySummary> {
        let opening = snapshots.first()?;
        let closing = snapshots.last()?;

        let spot_day_change = closing.spot_price - opening.spot_price;
        let spot_day_change_pct = if opening.spot_price != 0.0 {
            spot_day_change / opening.spot_price * 100.0
        } else {
            0.0
        };

        Some(DailySummary {
            trade_date,
            underlying,
            expiry_date: closing.expiry_date,
            opening_call_oi: opening.total_call_oi,
            opening_put_oi: opening.total_put_oi,
            opening_pcr: opening.pcr,
            opening_spot: opening.spot_price,
            closing_call_oi: closing.total_call_oi,
            closing_put_oi: closing.total_put_oi,
            closing_pcr: closing.pcr,
            closing_spot: closing.spot_price,
            call_oi_day_change: closing.total_call_oi - opening.total_call_oi,
            put_oi_day_change: closing.total_put_oi - opening.total_put_oi,
            pcr_day_change: closing.pcr - opening.pcr,
            spot_day_change,
            spot_day_change_pct,
            max_pain_strike: closing.max_pain_strike,
            highest_call_oi_strike: closing.highest_call_oi_strike,
            highest_put_oi_strike: closing.highest_put_oi_strike,
            dominant_signal: dominant_signal(snapshots),
        })
    }
}

/// Most frequent signal of the day; ties go to the signal seen first.
fn dominant_signal(snapshots: &[Snapshot]) -> Signal {
    debug_assert!(!snapshots.is_empty(), "caller guarantees a non-empty day");

    let mut counts: Vec<(Signal, usize)> = Vec::new();
    for snap in snapshots {
        match counts.iter_mut().find(|(sig, _)| *sig == snap.signal) {
            Some((_, n)) => *n += 1,
            None => counts.push((snap.signal, 1)),
        }
    }

    let mut best = counts[0];
    for &candidate in &counts[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    best.0
}
