//! Mutable task bookkeeping owned by the engine.
//!
//! All scheduler state lives in this one struct, wrapped in a mutex by
//! `SchedulerEngine` and exposed read-only through `SchedulerStatus` — no
//! module-level globals.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Outcome of the most recent attempt of one task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskStatus {
    /// Never attempted since process start.
    #[default]
    NotStarted,
    Success,
    /// Expected, recurring condition — retried on the next cadence slot.
    NoCredential,
    Error(String),
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::NotStarted => f.write_str("Not started"),
            TaskStatus::Success => f.write_str("Success"),
            TaskStatus::NoCredential => f.write_str("No credential"),
            TaskStatus::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Bookkeeping for one scheduled task.
#[derive(Debug, Clone, Default)]
pub struct TaskState {
    /// When the task last *attempted* to run (cadence gating keys off this).
    pub last_run: Option<NaiveDateTime>,
    pub status: TaskStatus,
    /// Date of the last successful run; guards once-daily windows.
    pub last_success_date: Option<NaiveDate>,
}

impl TaskState {
    pub fn record(&mut self, now: NaiveDateTime, status: TaskStatus) {
        self.last_run = Some(now);
        if status == TaskStatus::Success {
            self.last_success_date = Some(now.date());
        }
        self.status = status;
    }
}

/// All mutable scheduler state.
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub snapshot: TaskState,
    pub rollup: TaskState,
    pub cleanup: TaskState,
    pub reference_sync: TaskState,
}

impl SchedulerState {
    pub fn status(&self, running: bool) -> SchedulerStatus {
        SchedulerStatus {
            running,
            snapshot: self.snapshot.clone(),
            rollup: self.rollup.clone(),
            cleanup: self.cleanup.clone(),
            reference_sync: self.reference_sync.clone(),
        }
    }
}

/// Point-in-time copy of every task's bookkeeping, for the status surface.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub running: bool,
    pub snapshot: TaskState,
    pub rollup: TaskState,
    pub cleanup: TaskState,
    pub reference_sync: TaskState,
}
