//! Pure option-chain domain logic: underlyings, expiry and strike
//! resolution, provider contract-symbol encoding, chain aggregation and
//! signal classification.
//!
//! Nothing in this crate performs I/O or depends on the wall clock; every
//! time-sensitive function takes `now` as an argument.

pub mod aggregate;
pub mod contract;
pub mod expiry;
pub mod quote;
pub mod signal;
pub mod strikes;
pub mod underlying;

pub use aggregate::{ChainMetrics, StrikeEntry};
pub use quote::{OptionQuote, SpotQuote};
pub use signal::{Signal, SignalStrength};
pub use underlying::Underlying;
