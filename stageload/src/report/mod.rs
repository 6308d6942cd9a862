//! Aggregate run report and its output sinks

mod sink;
mod types;

pub use sink::{ReportConfig, ReportFormat, emit};
pub use types::RunReport;
