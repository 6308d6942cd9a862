//! RequestExecutor trait definition

use async_trait::async_trait;

use super::types::TransportError;
use crate::check::RequestOutcome;

/// One unit of work performed by a virtual user per iteration
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Issue the request and report what came back
    async fn execute(&self) -> Result<RequestOutcome, TransportError>;
}
