//! Run statistics
//!
//! Counters are atomics owned by [`RunStats`]; latency samples flow through
//! a channel to a single collector task.

mod aggregator;
mod latency;

pub use aggregator::{CheckSummary, RunStats, StatsSnapshot};
pub use latency::{LatencyStats, LatencySummary, spawn_latency_collector};
