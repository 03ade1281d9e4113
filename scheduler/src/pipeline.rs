//! Per-underlying capture: resolve contracts, fetch quotes, aggregate,
//! classify against the previous snapshot, persist.
//!
//! Aggregation completes entirely in memory; the single `insert` at the end
//! is the only write, so a failure anywhere leaves no partial row behind.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::warn;

use chain::aggregate;
use chain::contract::{OptionType, contract_symbol};
use chain::expiry;
use chain::quote::OptionQuote;
use chain::strikes;
use chain::underlying::Underlying;
use feed::{AccessToken, QUOTE_BATCH_SIZE, QuoteFeed};
use snapshot::model::Snapshot;
use snapshot::store::SnapshotStore;

use crate::config::SchedulerConfig;

/// Outcome of one capture attempt for one underlying.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Snapshot persisted.
    Captured(Snapshot),
    /// Provider had nothing usable this tick; nothing was persisted. An
    /// all-empty batch is indistinguishable from "provider temporarily
    /// empty" and must not poison signal history with a zero-everything row.
    NoData,
}

/// Run the full capture pipeline for one underlying at `now`.
pub async fn capture_snapshot<F, S>(
    feed: &F,
    store: &S,
    token: &AccessToken,
    cfg: &SchedulerConfig,
    underlying: Underlying,
    now: NaiveDateTime,
) -> anyhow::Result<CaptureOutcome>
where
    F: QuoteFeed,
    S: SnapshotStore,
{
    let spot = feed.spot(token, underlying.spot_symbol()).await?;
    if spot.last_price == 0.0 {
        warn!(underlying = %underlying, "no spot price available, skipping tick");
        return Ok(CaptureOutcome::NoData);
    }

    let step = cfg.strike_step(underlying);
    let expiry = expiry::nearest_expiry(underlying, now);
    let atm = strikes::atm_strike(spot.last_price, step);
    let grid = strikes::strike_grid(atm, step, cfg.strike_half_width);

    let mut symbols = Vec::with_capacity(grid.len() * 2);
    for &strike in &grid {
        symbols.push(contract_symbol(underlying, expiry, strike, OptionType::Call));
        symbols.push(contract_symbol(underlying, expiry, strike, OptionType::Put));
    }

    let quotes = fetch_quote_batches(feed, token, &symbols).await;
    if quotes.is_empty() {
        warn!(
            underlying = %underlying,
            expiry = %expiry,
            requested = symbols.len(),
            "provider returned no option quotes, skipping tick"
        );
        return Ok(CaptureOutcome::NoData);
    }

    let metrics = aggregate::aggregate(underlying, expiry, &quotes, spot, &grid);
    if !metrics.has_data() {
        return Ok(CaptureOutcome::NoData);
    }

    let previous = store.latest_before(underlying, now).await?;
    let snap = Snapshot::from_metrics(now, &metrics, previous.as_ref());
    store.insert(&snap).await?;

    Ok(CaptureOutcome::Captured(snap))
}

/// Fetch quotes in provider-sized batches. One failed batch is logged and
/// skipped; the remaining batches still contribute.
async fn fetch_quote_batches<F: QuoteFeed>(
    feed: &F,
    token: &AccessToken,
    symbols: &[String],
) -> HashMap<String, OptionQuote> {
    let mut all = HashMap::with_capacity(symbols.len());

    for batch in symbols.chunks(QUOTE_BATCH_SIZE) {
        match feed.quotes(token, batch).await {
            Ok(quotes) => all.extend(quotes),
            Err(err) => {
                warn!(error = %err, batch_len = batch.len(), "quote batch failed");
            }
        }
    }

    all
}
