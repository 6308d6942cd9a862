//! Transport error definitions

use std::time::Duration;

use thiserror::Error;

/// A request that failed before a response arrived
///
/// These are recorded per iteration and never abort a run.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect(_) => "connect",
            TransportError::Request(_) => "request",
        }
    }
}
