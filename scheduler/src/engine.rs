//! The orchestrating control loop.
//!
//! One background task polls on a fixed cadence and, per tick:
//!   1. syncs reference data on its slow cadence (never market-gated)
//!   2. skips everything else on weekends
//!   3. captures snapshots per underlying on the snapshot cadence, inside
//!      market hours
//!   4. fires the once-daily rollup and retention-cleanup windows
//!
//! Task bodies are isolated: a failure is logged and recorded in that task's
//! status and never aborts sibling tasks or the loop itself. The only
//! externally observable failure mode is a stale timestamp or an error
//! string in [`SchedulerStatus`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDateTime};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use chain::underlying::Underlying;
use common::logger::TraceId;
use feed::{AccessToken, CredentialSource, QuoteFeed};
use snapshot::store::SnapshotStore;

use crate::config::SchedulerConfig;
use crate::gate;
use crate::pipeline::{self, CaptureOutcome};
use crate::state::{SchedulerState, SchedulerStatus, TaskStatus};

pub struct SchedulerEngine<C, F, S> {
    cfg: SchedulerConfig,
    credentials: Arc<C>,
    feed: Arc<F>,
    store: Arc<S>,
    state: Arc<Mutex<SchedulerState>>,
    /// Serializes capture per underlying so a force-run never interleaves
    /// with the scheduled loop's read-then-insert. Held only around the
    /// capture body, never across unrelated tasks.
    capture_locks: Mutex<HashMap<Underlying, Arc<Mutex<()>>>>,
    running: AtomicBool,
}

impl<C, F, S> SchedulerEngine<C, F, S>
where
    C: CredentialSource,
    F: QuoteFeed,
    S: SnapshotStore,
{
    pub fn new(
        cfg: SchedulerConfig,
        credentials: Arc<C>,
        feed: Arc<F>,
        store: Arc<S>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            credentials,
            feed,
            store,
            state: Arc::new(Mutex::new(SchedulerState::default())),
            capture_locks: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Drive the loop until `shutdown` flips to true.
    ///
    /// Shutdown is only observed between ticks, so the in-flight task body
    /// always finishes — no half-aggregated snapshot is ever abandoned
    /// mid-write.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_secs = self.cfg.poll_interval.as_secs(),
            "scheduler loop started"
        );
        self.running.store(true, Ordering::SeqCst);

        // One immediate tick so a restart mid-session backfills right away
        // instead of waiting a full poll interval.
        self.tick(Local::now().naive_local()).await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.cfg.poll_interval) => {
                    self.tick(Local::now().naive_local()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("scheduler loop stopped");
    }

    /// One poll tick at `now`.
    ///
    /// Public so tests (and on-demand callers) can drive the engine with a
    /// controlled clock instead of waiting on the real one.
    pub async fn tick(&self, now: NaiveDateTime) {
        let sync_due = {
            let state = self.state.lock().await;
            gate::cadence_due(
                state.reference_sync.last_run,
                now,
                self.cfg.reference_sync_interval,
            )
        };
        if sync_due {
            self.run_reference_sync(now).await;
        }

        // No market work on weekends; no state is carried across gated
        // ticks.
        if gate::is_weekend(now.date()) {
            return;
        }

        let capture_due = {
            let state = self.state.lock().await;
            gate::market_is_open(now, self.cfg.market_open, self.cfg.market_close)
                && gate::cadence_due(state.snapshot.last_run, now, self.cfg.snapshot_interval)
        };
        if capture_due {
            self.run_snapshot_task(now).await;
        }

        let rollup_due = {
            let state = self.state.lock().await;
            gate::daily_window_due(state.rollup.last_success_date, now, self.cfg.rollup_window)
        };
        if rollup_due {
            self.run_rollup(now).await;
        }

        let cleanup_due = {
            let state = self.state.lock().await;
            gate::daily_window_due(state.cleanup.last_success_date, now, self.cfg.cleanup_window)
        };
        if cleanup_due {
            self.run_cleanup(now).await;
        }
    }

    /// On-demand capture for one underlying, re-entering the same pipeline
    /// body under the same per-underlying lock as the scheduled loop.
    ///
    /// Runs detached so callers are never blocked on provider I/O; the
    /// returned handle resolves to the capture's status.
    pub fn force_run(self: Arc<Self>, underlying: Underlying) -> JoinHandle<TaskStatus> {
        let engine = self;
        let trace_id = TraceId::new();

        tokio::spawn(async move {
            let now = Local::now().naive_local();
            info!(trace_id = %trace_id, underlying = %underlying, "force run requested");

            let status = engine.capture_one(underlying, now).await;
            engine
                .state
                .lock()
                .await
                .snapshot
                .record(now, status.clone());

            info!(trace_id = %trace_id, underlying = %underlying, status = %status, "force run finished");
            status
        })
    }

    /// Point-in-time task statuses for the status surface.
    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        state.status(self.running.load(Ordering::SeqCst))
    }

    async fn run_snapshot_task(&self, now: NaiveDateTime) {
        let token = match self.credentials.usable_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                // Expected while nobody has authenticated; the attempt still
                // consumes this cadence slot so we don't hammer every poll.
                warn!("no usable credential, skipping snapshot capture");
                let mut state = self.state.lock().await;
                state.snapshot.record(now, TaskStatus::NoCredential);
                return;
            }
            Err(err) => {
                error!(error = %err, "credential source failed");
                let mut state = self.state.lock().await;
                state.snapshot.record(now, TaskStatus::Error(err.to_string()));
                return;
            }
        };

        let mut failures: Vec<String> = Vec::new();
        for &underlying in Underlying::ALL.iter() {
            if let Err(msg) = self.capture_underlying(&token, underlying, now).await {
                failures.push(msg);
            }
        }

        let status = if failures.is_empty() {
            TaskStatus::Success
        } else {
            TaskStatus::Error(failures.join("; "))
        };
        let mut state = self.state.lock().await;
        state.snapshot.record(now, status);
    }

    /// Capture one underlying under its lock. `Err` carries the message
    /// recorded into the task status; sibling underlyings are unaffected.
    async fn capture_underlying(
        &self,
        token: &AccessToken,
        underlying: Underlying,
        now: NaiveDateTime,
    ) -> Result<(), String> {
        let lock = self.capture_lock(underlying).await;
        let _guard = lock.lock().await;

        match pipeline::capture_snapshot(
            self.feed.as_ref(),
            self.store.as_ref(),
            token,
            &self.cfg,
            underlying,
            now,
        )
        .await
        {
            Ok(CaptureOutcome::Captured(snap)) => {
                info!(
                    underlying = %underlying,
                    signal = %snap.signal,
                    strength = %snap.signal_strength,
                    pcr = snap.pcr,
                    "snapshot captured"
                );
                Ok(())
            }
            Ok(CaptureOutcome::NoData) => {
                info!(underlying = %underlying, "no usable chain data, nothing persisted");
                Ok(())
            }
            Err(err) => {
                error!(underlying = %underlying, error = %err, "snapshot capture failed");
                Err(format!("{}: {}", underlying, err))
            }
        }
    }

    /// Shared body for the force-run path: fetch a credential, then capture.
    async fn capture_one(&self, underlying: Underlying, now: NaiveDateTime) -> TaskStatus {
        match self.credentials.usable_token().await {
            Ok(Some(token)) => match self.capture_underlying(&token, underlying, now).await {
                Ok(()) => TaskStatus::Success,
                Err(msg) => TaskStatus::Error(msg),
            },
            Ok(None) => {
                warn!(underlying = %underlying, "no usable credential for force run");
                TaskStatus::NoCredential
            }
            Err(err) => TaskStatus::Error(err.to_string()),
        }
    }

    async fn run_rollup(&self, now: NaiveDateTime) {
        let mut failures: Vec<String> = Vec::new();

        for &underlying in Underlying::ALL.iter() {
            match self.store.upsert_daily_summary(underlying, now.date()).await {
                Ok(Some(summary)) => {
                    info!(
                        underlying = %underlying,
                        dominant_signal = %summary.dominant_signal,
                        "daily summary rolled up"
                    );
                }
                Ok(None) => {
                    info!(underlying = %underlying, "no snapshots today, rollup skipped");
                }
                Err(err) => {
                    error!(underlying = %underlying, error = %err, "daily rollup failed");
                    failures.push(format!("{}: {}", underlying, err));
                }
            }
        }

        let status = if failures.is_empty() {
            TaskStatus::Success
        } else {
            TaskStatus::Error(failures.join("; "))
        };
        let mut state = self.state.lock().await;
        state.rollup.record(now, status);
    }

    async fn run_cleanup(&self, now: NaiveDateTime) {
        match self.store.cleanup(now, self.cfg.retention_days).await {
            Ok(removed) => {
                info!(
                    removed,
                    retention_days = self.cfg.retention_days,
                    "snapshot retention cleanup done"
                );
                let mut state = self.state.lock().await;
                state.cleanup.record(now, TaskStatus::Success);
            }
            Err(err) => {
                error!(error = %err, "snapshot retention cleanup failed");
                let mut state = self.state.lock().await;
                state.cleanup.record(now, TaskStatus::Error(err.to_string()));
            }
        }
    }

    async fn run_reference_sync(&self, now: NaiveDateTime) {
        match self.feed.sync_reference_data().await {
            Ok(()) => {
                info!("reference data synced");
                let mut state = self.state.lock().await;
                state.reference_sync.record(now, TaskStatus::Success);
            }
            Err(err) => {
                warn!(error = %err, "reference data sync failed");
                let mut state = self.state.lock().await;
                state
                    .reference_sync
                    .record(now, TaskStatus::Error(err.to_string()));
            }
        }
    }

    async fn capture_lock(&self, underlying: Underlying) -> Arc<Mutex<()>> {
        let mut locks = self.capture_locks.lock().await;
        locks.entry(underlying).or_default().clone()
    }
}
