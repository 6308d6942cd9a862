//! Ramp profiles for staged load
//!
//! This module provides:
//! - `Stage` and `RampProfile` describing how concurrency changes over a run
//! - `RampPolicy` selecting step or linear transitions between stages
//! - Schedule math answering "how many virtual users right now?"
//! - Human-readable duration parsing ("30s", "1m30s", "500ms")

pub mod duration;
mod schedule;
mod types;

pub use duration::{format_duration, parse_duration};
pub use types::{ProfileError, RampPolicy, RampProfile, Stage};
