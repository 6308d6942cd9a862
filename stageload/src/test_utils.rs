//! Test Utilities Module
//!
//! Scripted request executors for driving the runner without a network.
//! This module is only compiled when running tests.

#![cfg(test)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::check::RequestOutcome;
use crate::client::{RequestExecutor, TransportError};

type Responder = Box<dyn Fn(u64) -> Result<RequestOutcome, TransportError> + Send + Sync>;

/// Executor that sleeps for a fixed latency, then answers from a closure
///
/// The closure receives the zero-based call number.
pub struct MockExecutor {
    latency: Duration,
    respond: Responder,
    calls: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExecutor {
    pub fn new<F>(latency: Duration, respond: F) -> Self
    where
        F: Fn(u64) -> Result<RequestOutcome, TransportError> + Send + Sync + 'static,
    {
        Self {
            latency,
            respond: Box::new(respond),
            calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 200 with `X-Beamlit-Proxy: true`
    pub fn ok(latency: Duration) -> Self {
        Self::new(latency, |_| {
            Ok(RequestOutcome::new(200).with_header("X-Beamlit-Proxy", "true"))
        })
    }

    /// Always the given status, no headers
    pub fn status(latency: Duration, status: u16) -> Self {
        Self::new(latency, move |_| Ok(RequestOutcome::new(status)))
    }

    /// Connection refused on every call
    pub fn failing(latency: Duration) -> Self {
        Self::new(latency, |_| {
            Err(TransportError::Connect("connection refused".into()))
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self) -> Result<RequestOutcome, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(call)
    }
}
