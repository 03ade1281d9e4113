use std::time::Duration;

use chrono::NaiveTime;

use chain::underlying::Underlying;

fn hm(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).expect("valid wall-clock time")
}

/// Scheduling knobs for the snapshot pipeline.
///
/// These are global timing parameters plus the per-underlying strike
/// geometry.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Control-loop poll cadence. Tasks are *checked* this often; each task
    /// fires on its own interval/window below.
    pub poll_interval: Duration,

    /// Gap between snapshot captures. Applies uniformly to every
    /// underlying; captures inside one task run are sequential.
    pub snapshot_interval: Duration,

    /// Gap between reference-data (symbol master) syncs.
    /// Runs independently of market hours.
    pub reference_sync_interval: Duration,

    /// Capture runs only on weekdays between these wall-clock times
    /// (inclusive bounds). Kept wider than exchange trading hours so
    /// pre-open and post-close provider data still lands.
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,

    /// The end-of-day rollup fires once per day inside [start, end).
    pub rollup_window: (NaiveTime, NaiveTime),

    /// Retention cleanup fires once per day inside [start, end).
    pub cleanup_window: (NaiveTime, NaiveTime),

    /// Snapshots older than this many days are deleted by cleanup.
    /// Daily summaries are never deleted.
    pub retention_days: u32,

    /// Strikes kept on each side of ATM; the captured chain covers
    /// `2 * strike_half_width + 1` strikes.
    pub strike_half_width: i32,

    /// Strike spacing overrides per underlying.
    pub nifty_strike_step: f64,
    pub banknifty_strike_step: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            snapshot_interval: Duration::from_secs(900),
            reference_sync_interval: Duration::from_secs(86_400),
            market_open: hm(9, 0),
            market_close: hm(18, 0),
            rollup_window: (hm(15, 30), hm(15, 45)),
            cleanup_window: (hm(18, 0), hm(18, 15)),
            retention_days: 7,
            strike_half_width: 15,
            nifty_strike_step: Underlying::Nifty.strike_step(),
            banknifty_strike_step: Underlying::BankNifty.strike_step(),
        }
    }
}

impl SchedulerConfig {
    /// Read overrides from the environment, falling back to defaults, and
    /// validate the result.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("POLL_INTERVAL_SECS") {
            cfg.poll_interval = Duration::from_secs(v.parse()?);
        }
        if let Ok(v) = std::env::var("SNAPSHOT_INTERVAL_SECS") {
            cfg.snapshot_interval = Duration::from_secs(v.parse()?);
        }
        if let Ok(v) = std::env::var("REFERENCE_SYNC_INTERVAL_SECS") {
            cfg.reference_sync_interval = Duration::from_secs(v.parse()?);
        }
        if let Ok(v) = std::env::var("MARKET_OPEN") {
            cfg.market_open = NaiveTime::parse_from_str(&v, "%H:%M")?;
        }
        if let Ok(v) = std::env::var("MARKET_CLOSE") {
            cfg.market_close = NaiveTime::parse_from_str(&v, "%H:%M")?;
        }
        if let Ok(v) = std::env::var("RETENTION_DAYS") {
            cfg.retention_days = v.parse()?;
        }
        if let Ok(v) = std::env::var("STRIKE_HALF_WIDTH") {
            cfg.strike_half_width = v.parse()?;
        }
        if let Ok(v) = std::env::var("NIFTY_STRIKE_STEP") {
            cfg.nifty_strike_step = v.parse()?;
        }
        if let Ok(v) = std::env::var("BANKNIFTY_STRIKE_STEP") {
            cfg.banknifty_strike_step = v.parse()?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Config errors surface here, at startup — never per tick.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.poll_interval > Duration::ZERO,
            "poll interval must be positive"
        );
        anyhow::ensure!(
            self.snapshot_interval > Duration::ZERO,
            "snapshot interval must be positive"
        );
        anyhow::ensure!(self.retention_days > 0, "retention must be at least one day");
        anyhow::ensure!(self.strike_half_width > 0, "strike half width must be positive");
        anyhow::ensure!(
            self.nifty_strike_step > 0.0 && self.banknifty_strike_step > 0.0,
            "strike steps must be positive"
        );
        anyhow::ensure!(
            self.market_open < self.market_close,
            "market open must precede close"
        );
        anyhow::ensure!(
            self.rollup_window.0 < self.rollup_window.1,
            "rollup window must be non-empty"
        );
        anyhow::ensure!(
            self.cleanup_window.0 < self.cleanup_window.1,
            "cleanup window must be non-empty"
        );
        Ok(())
    }

    /// Strike spacing for one underlying.
    pub fn strike_step(&self, underlying: Underlying) -> f64 {
        match underlying {
            Underlying::Nifty => self.nifty_strike_step,
            Underlying::BankNifty => self.banknifty_strike_step,
        }
    }
}
