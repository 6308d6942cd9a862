//! Stageload Library
//!
//! Staged HTTP load driver: virtual users repeatedly GET a target, every
//! response is judged by a set of named checks, and concurrency follows a
//! ramp profile of timed stages. This module exports the components for use
//! in integration tests and external tooling.

pub mod check;
pub mod client;
pub mod config;
pub mod observability;
pub mod profile;
pub mod report;
pub mod runner;
pub mod stats;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use check::{Check, CheckPredicate, RequestOutcome};
pub use client::{HttpExecutor, RequestExecutor, TransportError};
pub use config::{Config, ConfigError, LoadConfig, RequestConfig};
pub use profile::{RampPolicy, RampProfile, Stage};
pub use report::RunReport;
pub use runner::{DriverState, DriverStatus, StagedDriver};
