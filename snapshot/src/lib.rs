//! Persistence for the option-chain pipeline: intraday snapshots with
//! bounded retention, plus the permanent per-day rollup.

pub mod model;
pub mod store;

pub use model::{DailySummary, Snapshot};
pub use store::SnapshotStore;
