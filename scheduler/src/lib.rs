//! Market-hours-aware orchestration of the option-chain snapshot pipeline.
//!
//! One background loop drives capture, end-of-day rollup, retention cleanup
//! and reference-data sync on their own cadences. All predicates are pure
//! and take `now` explicitly, so tests drive the engine with a synthetic
//! clock via [`engine::SchedulerEngine::tick`].

pub mod config;
pub mod engine;
pub mod gate;
pub mod pipeline;
pub mod state;

pub use config::SchedulerConfig;
pub use engine::SchedulerEngine;
pub use state::{SchedulerStatus, TaskStatus};
