//! Staged load driver
//!
//! This module provides:
//! - `StagedDriver` which executes a ramp profile and returns a `RunReport`
//! - `DriverState` / `DriverStatus` describing run progress
//! - The virtual-user pool the driver resizes on every control tick

mod driver;
mod pool;
mod state;

pub use driver::StagedDriver;
pub use state::{DriverState, DriverStatus};
