//! Raw quote shapes as delivered by the feed.

use serde::{Deserialize, Serialize};

/// One option contract quote.
///
/// Providers routinely omit fields for illiquid strikes, so everything here
/// is optional. "Missing = zero" is applied exactly once, at the
/// aggregation boundary — nowhere else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Outstanding open interest.
    #[serde(default)]
    pub oi: Option<i64>,

    /// Previous trading day's open interest.
    #[serde(default)]
    pub prev_day_oi: Option<i64>,

    /// Last traded price.
    #[serde(default)]
    pub ltp: Option<f64>,

    /// Contracts traded today.
    #[serde(default)]
    pub volume: Option<i64>,
}

/// Spot quote for an underlying index.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpotQuote {
    pub last_price: f64,
    pub prev_close: f64,
}
