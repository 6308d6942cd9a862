//! RunReport: what a finished run produced

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::profile::RampPolicy;
use crate::profile::duration::human;
use crate::stats::{CheckSummary, LatencySummary};

/// Aggregate outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Wall-clock time from first tick to end of draining
    #[serde(with = "human")]
    pub elapsed: Duration,
    /// Sum of stage durations
    #[serde(with = "human")]
    pub planned_duration: Duration,
    pub stages: usize,
    pub policy: RampPolicy,
    /// True if the run was stopped before the profile finished
    pub cancelled: bool,

    pub total_requests: u64,
    pub transport_errors: u64,
    pub interrupted_iterations: u64,

    pub checks_passed: u64,
    pub checks_failed: u64,
    /// Per-check totals in configuration order
    pub checks: Vec<CheckSummary>,

    /// Round-trip latency of requests that got a response
    pub latency: Option<LatencySummary>,

    pub peak_concurrency: usize,
    pub final_concurrency: usize,
}

impl RunReport {
    pub fn checks_total(&self) -> u64 {
        self.checks_passed + self.checks_failed
    }

    /// Fraction of checks that passed (1.0 when no checks ran)
    pub fn pass_rate(&self) -> f64 {
        let total = self.checks_total();
        if total > 0 {
            self.checks_passed as f64 / total as f64
        } else {
            1.0
        }
    }

    pub fn all_checks_passed(&self) -> bool {
        self.checks_failed == 0
    }

    /// Requests per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests as f64 / secs
        } else {
            0.0
        }
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let rule = "═══════════════════════════════════════════════════════════════";

        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!(
            " RUN {} ({} stages, {} ramp){}\n",
            self.run_id,
            self.stages,
            self.policy,
            if self.cancelled { " CANCELLED" } else { "" }
        ));
        out.push_str(&format!("{}\n\n", rule));

        out.push_str(&format!(
            "   Duration:       {:.2}s (planned {:.2}s)\n",
            self.elapsed.as_secs_f64(),
            self.planned_duration.as_secs_f64()
        ));
        out.push_str(&format!(
            "   Requests:       {} ({:.1} req/s)\n",
            self.total_requests,
            self.throughput()
        ));
        out.push_str(&format!("   Transport errs: {}\n", self.transport_errors));
        if self.interrupted_iterations > 0 {
            out.push_str(&format!(
                "   Interrupted:    {}\n",
                self.interrupted_iterations
            ));
        }
        out.push_str(&format!(
            "   Virtual users:  peak {}, final {}\n\n",
            self.peak_concurrency, self.final_concurrency
        ));

        out.push_str(" ─── Checks ──────────────────────────────────────────────────\n");
        for check in &self.checks {
            let mark = if check.failed == 0 { "✓" } else { "✗" };
            out.push_str(&format!(
                "   {} {}  ({} passed, {} failed)\n",
                mark, check.name, check.passed, check.failed
            ));
        }
        out.push_str(&format!(
            "   Total: {} passed, {} failed ({:.2}%)\n\n",
            self.checks_passed,
            self.checks_failed,
            self.pass_rate() * 100.0
        ));

        out.push_str(" ─── Latency ─────────────────────────────────────────────────\n");
        match &self.latency {
            Some(l) => {
                out.push_str(&format!(
                    "   min {:.2}ms  mean {:.2}ms  max {:.2}ms\n",
                    l.min_ms, l.mean_ms, l.max_ms
                ));
                out.push_str(&format!(
                    "   P50 {:.2}ms  P90 {:.2}ms  P99 {:.2}ms\n",
                    l.p50_ms, l.p90_ms, l.p99_ms
                ));
            }
            None => out.push_str("   (no responses)\n"),
        }

        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&format!(
            " OVERALL: {}\n",
            if self.all_checks_passed() {
                "PASS"
            } else {
                "FAIL (checks failed)"
            }
        ));
        out.push_str(&format!("{}\n", rule));
        out
    }

    /// JSON output for CI parsing
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| error_json(&e))
    }
}

fn error_json(err: &dyn std::fmt::Display) -> String {
    serde_json::json!({ "error": err.to_string() }).to_string()
}
