//! Chain-level aggregation: OI totals, PCR, OI concentration, max pain.
//!
//! `aggregate` is a pure fold over one tick's quote batch. It builds the
//! contract symbol for each grid strike itself, so symbol encoding and quote
//! lookup cannot drift apart. Missing quotes (or missing fields inside a
//! quote) degrade to zero here and only here.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contract::{OptionType, contract_symbol};
use crate::quote::{OptionQuote, SpotQuote};
use crate::underlying::Underlying;

/// Per-strike OI breakdown row.
///
/// The `*_oi_change` fields are vs. the provider's previous-day OI, which is
/// the only per-contract baseline the quote payload carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeEntry {
    pub strike: f64,
    pub call_oi: i64,
    pub put_oi: i64,
    pub call_oi_change: i64,
    pub put_oi_change: i64,
    pub call_ltp: f64,
    pub put_ltp: f64,
    pub call_volume: i64,
    pub put_volume: i64,
}

/// One fully aggregated option chain for a single tick.
#[derive(Debug, Clone)]
pub struct ChainMetrics {
    pub underlying: Underlying,
    pub expiry: NaiveDate,
    pub spot_price: f64,
    pub prev_close: f64,

    pub total_call_oi: i64,
    pub total_put_oi: i64,
    /// total_put_oi / total_call_oi, 0 when there is no call OI.
    /// Rounded to 3 decimals.
    pub pcr: f64,

    pub max_pain_strike: f64,
    pub highest_call_oi_strike: f64,
    pub highest_put_oi_strike: f64,

    /// Ascending, one entry per grid strike; zeros where nothing matched.
    pub strikes: Vec<StrikeEntry>,

    /// How many contract quotes contributed. Zero means the provider
    /// returned nothing usable; such a chain must never be persisted,
    /// or an all-zero row would fake a signal transition.
    pub matched_quotes: usize,
}

impl ChainMetrics {
    pub fn has_data(&self) -> bool {
        self.matched_quotes > 0
    }
}

/// Fold one tick's quote batch into chain metrics for `underlying`.
///
/// Quotes are looked up per grid strike and side; a strike with no quote on
/// either side still appears in the breakdown with zeros. Ties for the
/// highest-OI strikes go to the lower strike (first seen in grid order).
pub fn aggregate(
    underlying: Underlying,
    expiry: NaiveDate,
    quotes: &HashMap<String, OptionQuote>,
    spot: SpotQuote,
    grid: &[f64],
) -> ChainMetrics {
    let mut strikes = Vec::with_capacity(grid.len());
    let mut total_call_oi = 0i64;
    let mut total_put_oi = 0i64;
    let mut matched_quotes = 0usize;

    // (strike, oi) pairs; first-seen wins on equal OI.
    let mut highest_call = (0.0f64, 0i64);
    let mut highest_put = (0.0f64, 0i64);

    for &strike in grid {
        let mut entry = StrikeEntry {
            strike,
            ..StrikeEntry::default()
        };

        let call_id = contract_symbol(underlying, expiry, strike, OptionType::Call);
        if let Some(q) = quotes.get(&call_id) {
            let oi = q.oi.unwrap_or(0);
            entry.call_oi = oi;
            entry.call_oi_change = oi - q.prev_day_oi.unwrap_or(0);
            entry.call_ltp = q.ltp.unwrap_or(0.0);
            entry.call_volume = q.volume.unwrap_or(0);

            total_call_oi += oi;
            matched_quotes += 1;

            if oi > highest_call.1 {
                highest_call = (strike, oi);
            }
        }

        let put_id = contract_symbol(underlying, expiry, strike, OptionType::Put);
        if let Some(q) = quotes.get(&put_id) {
            let oi = q.oi.unwrap_or(0);
            entry.put_oi = oi;
            entry.put_oi_change = oi - q.prev_day_oi.unwrap_or(0);
            entry.put_ltp = q.ltp.unwrap_or(0.0);
            entry.put_volume = q.volume.unwrap_or(0);

            total_put_oi += oi;
            matched_quotes += 1;

            if oi > highest_put.1 {
                highest_put = (strike, oi);
            }
        }

        strikes.push(entry);
    }

    let pcr = if total_call_oi > 0 {
        round3(total_put_oi as f64 / total_call_oi as f64)
    } else {
        0.0
    };

    let max_pain_strike = max_pain(grid, &strikes);

    ChainMetrics {
        underlying,
        expiry,
        spot_price: spot.last_price,
        prev_close: spot.prev_close,
        total_call_oi,
        total_put_oi,
        pcr,
        max_pain_strike,
        highest_call_oi_strike: highest_call.0,
        highest_put_oi_strike: highest_put.0,
        strikes,
        matched_quotes,
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// The settlement strike minimizing aggregate option-writer payout.
///
/// For a candidate settlement `k`: calls struck below pay `(k - s) * call_oi`,
/// puts struck above pay `(s - k) * put_oi`. The first strike (ascending)
/// with the strict minimum wins. The grid is ~31 strikes, so the O(n²) scan
/// is not worth optimizing.
pub fn max_pain(grid: &[f64], strikes: &[StrikeEntry]) -> f64 {
    let mut min_pain = f64::INFINITY;
    let mut winner = 0.0;

    for &candidate in grid {
        let mut pain = 0.0;

        for entry in strikes {
            if candidate > entry.strike {
                pain += (candidate - entry.strike) * entry.call_oi as f64;
            } else if candidate < entry.strike {
                pain += (entry.strike - candidate) * entry.put_oi as f64;
            }
        }

        if pain < min_pain {
            min_pain = pain;
            winner = candidate;
        }
    }

    winner
}
