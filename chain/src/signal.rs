//! OI/price signal classification.

use std::fmt;
use std::str::FromStr;

/// Market-direction reading derived from one snapshot-over-snapshot
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Price up, OI up — fresh longs.
    LongBuildup,
    /// Price up, OI down — shorts exiting.
    ShortCovering,
    /// Price down, OI up — fresh shorts.
    ShortBuildup,
    /// Price down, OI down — longs exiting.
    LongUnwinding,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::LongBuildup => "LONG_BUILDUP",
            Signal::ShortCovering => "SHORT_COVERING",
            Signal::ShortBuildup => "SHORT_BUILDUP",
            Signal::LongUnwinding => "LONG_UNWINDING",
        };
        f.write_str(s)
    }
}

impl FromStr for Signal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LONG_BUILDUP" => Ok(Signal::LongBuildup),
            "SHORT_COVERING" => Ok(Signal::ShortCovering),
            "SHORT_BUILDUP" => Ok(Signal::ShortBuildup),
            "LONG_UNWINDING" => Ok(Signal::LongUnwinding),
            other => Err(anyhow::anyhow!("Invalid signal value: {}", other)),
        }
    }
}

/// Conviction behind a signal, read off the PCR skew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStrength::Strong => "STRONG",
            SignalStrength::Moderate => "MODERATE",
            SignalStrength::Weak => "WEAK",
        };
        f.write_str(s)
    }
}

impl FromStr for SignalStrength {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG" => Ok(SignalStrength::Strong),
            "MODERATE" => Ok(SignalStrength::Moderate),
            "WEAK" => Ok(SignalStrength::Weak),
            other => Err(anyhow::anyhow!("Invalid signal strength value: {}", other)),
        }
    }
}

/// Four-quadrant classification over price and total-OI movement.
///
/// Both deltas are vs. the previous snapshot of the same underlying and
/// default to zero when there is none. A fresh series therefore reads
/// LONG_UNWINDING until a second snapshot exists; deliberate, pinned by
/// tests, and flagged in the product docs rather than silently changed.
pub fn classify(price_change: f64, total_oi_change: i64) -> Signal {
    let price_up = price_change > 0.0;
    let oi_up = total_oi_change > 0;

    match (price_up, oi_up) {
        (true, true) => Signal::LongBuildup,
        (true, false) => Signal::ShortCovering,
        (false, true) => Signal::ShortBuildup,
        (false, false) => Signal::LongUnwinding,
    }
}

/// Strength from PCR magnitude alone, independent of the signal quadrant:
/// deep put- or call-heavy chains read as conviction.
pub fn strength_from_pcr(pcr: f64) -> SignalStrength {
    if pcr > 1.5 || pcr < 0.6 {
        SignalStrength::Strong
    } else if pcr > 1.2 || pcr < 0.8 {
        SignalStrength::Moderate
    } else {
        SignalStrength::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_up_oi_up_is_long_buildup() {
        assert_eq!(classify(5.0, 100), Signal::LongBuildup);
    }

    #[test]
    fn price_up_oi_down_is_short_covering() {
        assert_eq!(classify(5.0, -50), Signal::ShortCovering);
    }

    #[test]
    fn price_down_oi_up_is_short_buildup() {
        assert_eq!(classify(-3.0, 20), Signal::ShortBuildup);
    }

    #[test]
    fn flat_everything_is_long_unwinding() {
        // First-snapshot boundary: both deltas default to zero.
        assert_eq!(classify(0.0, 0), Signal::LongUnwinding);
    }

    #[test]
    fn zero_oi_change_counts_as_not_up() {
        assert_eq!(classify(5.0, 0), Signal::ShortCovering);
        assert_eq!(classify(-5.0, 0), Signal::LongUnwinding);
    }

    #[test]
    fn strength_bands() {
        assert_eq!(strength_from_pcr(2.0), SignalStrength::Strong);
        assert_eq!(strength_from_pcr(0.5), SignalStrength::Strong);
        assert_eq!(strength_from_pcr(1.3), SignalStrength::Moderate);
        assert_eq!(strength_from_pcr(0.7), SignalStrength::Moderate);
        assert_eq!(strength_from_pcr(1.0), SignalStrength::Weak);
        assert_eq!(strength_from_pcr(1.2), SignalStrength::Weak);
        assert_eq!(strength_from_pcr(0.8), SignalStrength::Weak);
    }

    #[test]
    fn wire_names_round_trip() {
        for sig in [
            Signal::LongBuildup,
            Signal::ShortCovering,
            Signal::ShortBuildup,
            Signal::LongUnwinding,
        ] {
            assert_eq!(sig.to_string().parse::<Signal>().unwrap(), sig);
        }
        for st in [
            SignalStrength::Strong,
            SignalStrength::Moderate,
            SignalStrength::Weak,
        ] {
            assert_eq!(st.to_string().parse::<SignalStrength>().unwrap(), st);
        }
    }
}
