//! Latency samples and their summary

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Round-trip latencies collected during a run
///
/// Every sample is kept (16 bytes each) so percentiles are exact; a run of
/// 100 million requests holds about 1.6 GB here.
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub samples: Vec<Duration>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summarize the samples; `None` when nothing was recorded
    pub fn summary(&self) -> Option<LatencySummary> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort();

        let percentile = |p: f64| {
            let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        let total_ms: f64 = sorted.iter().map(|d| as_ms(*d)).sum();

        Some(LatencySummary {
            count: sorted.len(),
            min_ms: as_ms(sorted[0]),
            mean_ms: total_ms / sorted.len() as f64,
            p50_ms: as_ms(percentile(50.0)),
            p90_ms: as_ms(percentile(90.0)),
            p99_ms: as_ms(percentile(99.0)),
            max_ms: as_ms(sorted[sorted.len() - 1]),
        })
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Latency distribution in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Spawn the single consumer that owns all latency samples
///
/// Completes once every sender has been dropped.
pub fn spawn_latency_collector(mut rx: mpsc::Receiver<Duration>) -> JoinHandle<LatencyStats> {
    tokio::spawn(async move {
        let mut stats = LatencyStats::new();
        while let Some(latency) = rx.recv().await {
            stats.record(latency);
        }
        stats
    })
}
