//! Run-wide counters shared by every virtual user

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;

use crate::check::{Check, CheckResult};
use crate::client::TransportError;

/// Pass/fail counters for one named check
#[derive(Debug, Default)]
struct CheckCounters {
    passed: AtomicU64,
    failed: AtomicU64,
}

/// Aggregate counters for a run
///
/// The set of checks is fixed at construction, so recording never takes a
/// lock: every update is a single atomic increment.
#[derive(Debug)]
pub struct RunStats {
    iterations: AtomicU64,
    transport_errors: AtomicU64,
    interrupted_iterations: AtomicU64,
    checks_passed: AtomicU64,
    checks_failed: AtomicU64,
    /// Per-check counters in configuration order
    per_check: IndexMap<String, CheckCounters>,
}

impl RunStats {
    pub fn new(checks: &[Check]) -> Self {
        Self {
            iterations: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            interrupted_iterations: AtomicU64::new(0),
            checks_passed: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            per_check: checks
                .iter()
                .map(|c| (c.name.clone(), CheckCounters::default()))
                .collect(),
        }
    }

    /// Count one completed iteration (one request, successful or not)
    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stageload_requests_total").increment(1);
    }

    pub fn record_transport_error(&self, err: &TransportError) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stageload_transport_errors_total", "kind" => err.kind()).increment(1);
    }

    /// Count iterations abandoned because draining ran out of time
    pub fn record_interrupted(&self, count: u64) {
        self.interrupted_iterations.fetch_add(count, Ordering::Relaxed);
    }

    /// Record the results of one evaluation of the check set
    ///
    /// `results` must be in the order the checks were given to [`RunStats::new`].
    pub fn record_results(&self, results: &[CheckResult<'_>]) {
        for (index, result) in results.iter().enumerate() {
            let (total, outcome) = if result.passed {
                (&self.checks_passed, "pass")
            } else {
                (&self.checks_failed, "fail")
            };
            total.fetch_add(1, Ordering::Relaxed);

            if let Some((_, counters)) = self.per_check.get_index(index) {
                let counter = if result.passed {
                    &counters.passed
                } else {
                    &counters.failed
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }

            metrics::counter!(
                "stageload_checks_total",
                "check" => result.name.to_string(),
                "result" => outcome
            )
            .increment(1);
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            iterations: self.iterations.load(Ordering::SeqCst),
            transport_errors: self.transport_errors.load(Ordering::SeqCst),
            interrupted_iterations: self.interrupted_iterations.load(Ordering::SeqCst),
            checks_passed: self.checks_passed.load(Ordering::SeqCst),
            checks_failed: self.checks_failed.load(Ordering::SeqCst),
            checks: self
                .per_check
                .iter()
                .map(|(name, counters)| CheckSummary {
                    name: name.clone(),
                    passed: counters.passed.load(Ordering::SeqCst),
                    failed: counters.failed.load(Ordering::SeqCst),
                })
                .collect(),
        }
    }
}

/// Pass/fail totals for one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passed: u64,
    pub failed: u64,
}

impl CheckSummary {
    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }
}

/// Counter values copied out of [`RunStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub iterations: u64,
    pub transport_errors: u64,
    pub interrupted_iterations: u64,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub checks: Vec<CheckSummary>,
}

impl StatsSnapshot {
    pub fn checks_total(&self) -> u64 {
        self.checks_passed + self.checks_failed
    }
}
