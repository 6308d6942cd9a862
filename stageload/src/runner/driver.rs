//! StagedDriver: runs a ramp profile to completion

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pool::{ThinkTime, VuContext, VuPool};
use super::state::{DriverState, DriverStatus};
use crate::client::RequestExecutor;
use crate::config::{ConfigError, LoadConfig};
use crate::profile::format_duration;
use crate::report::RunReport;
use crate::stats::{LatencyStats, RunStats, spawn_latency_collector};

/// Buffered latency samples between virtual users and the collector
const LATENCY_CHANNEL_CAPACITY: usize = 10_000;

/// Wake at the end of the profile; without a representable deadline the
/// control tick alone notices the profile has run out
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Drives virtual users through a ramp profile
///
/// Every control tick the driver works out the target concurrency for the
/// elapsed time and resizes the pool to match. Failed checks and transport
/// errors are recorded and never stop the schedule. When the profile runs
/// out (or the shutdown future resolves) the driver drains the pool and
/// returns the aggregate report.
pub struct StagedDriver {
    config: LoadConfig,
    executor: Arc<dyn RequestExecutor>,
    status_tx: watch::Sender<DriverStatus>,
}

impl StagedDriver {
    /// Validate `config`; a bad config never issues a request
    pub fn new(
        config: LoadConfig,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (status_tx, _) = watch::channel(DriverStatus::default());
        Ok(Self {
            config,
            executor,
            status_tx,
        })
    }

    /// Observe state, target and active concurrency as the run progresses
    pub fn subscribe(&self) -> watch::Receiver<DriverStatus> {
        self.status_tx.subscribe()
    }

    /// Run the whole profile
    pub async fn run(self) -> RunReport {
        self.run_until(std::future::pending()).await
    }

    /// Run the profile, draining early if `shutdown` resolves first
    pub async fn run_until<F>(self, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        let profile = &self.config.profile;
        let policy = self.config.policy;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            "Starting run {}: {} stages over {} ({} ramp, {} checks)",
            run_id,
            profile.len(),
            format_duration(profile.total_duration()),
            policy,
            self.config.checks.len()
        );

        let stats = Arc::new(RunStats::new(&self.config.checks));
        let (latency_tx, latency_rx) = mpsc::channel(LATENCY_CHANNEL_CAPACITY);
        let collector = spawn_latency_collector(latency_rx);
        let (stop_tx, stop_rx) = watch::channel(false);

        let ctx = Arc::new(VuContext {
            executor: Arc::clone(&self.executor),
            checks: self.config.checks.clone(),
            stats: Arc::clone(&stats),
            latency_tx,
            think_time: ThinkTime {
                base: self.config.think_time,
                jitter: self.config.think_time_jitter,
            },
        });
        let mut pool = VuPool::new(ctx, stop_rx);

        let start = Instant::now();
        let deadline = start.checked_add(profile.total_duration());
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut state = DriverState::Idle;
        let mut cancelled = false;

        loop {
            let elapsed = start.elapsed();
            let next = state.advance(profile.stage_at(elapsed), cancelled);
            if next != state {
                self.log_transition(next);
                state = next;
            }
            if state == DriverState::Draining {
                break;
            }

            let target = profile.target_at(elapsed, policy);
            pool.scale_to(target as usize);
            self.publish(state, target, pool.active());

            tokio::select! {
                _ = ticker.tick() => {}
                _ = sleep_until_deadline(deadline) => {}
                _ = &mut shutdown => {
                    warn!("Shutdown requested, draining early");
                    cancelled = true;
                }
            }
        }

        info!("Draining {} virtual users", pool.active());
        self.publish(state, 0, pool.active());
        stop_tx.send_replace(true);

        let interrupted = pool.drain(self.config.graceful_stop).await;
        if interrupted > 0 {
            warn!(
                "{} iterations still running after {} graceful stop were interrupted",
                interrupted,
                format_duration(self.config.graceful_stop)
            );
            stats.record_interrupted(interrupted);
        }
        let peak_concurrency = pool.peak();
        let final_concurrency = pool.active();

        // The pool owns the last latency sender; dropping it ends the collector
        drop(pool);
        let latencies = collector.await.unwrap_or_else(|e| {
            warn!("Latency collector failed: {}", e);
            LatencyStats::new()
        });

        state = state.finish();
        self.publish(state, 0, final_concurrency);
        let elapsed = start.elapsed();

        let snapshot = stats.snapshot();
        let report = RunReport {
            run_id,
            started_at,
            elapsed,
            planned_duration: profile.total_duration(),
            stages: profile.len(),
            policy,
            cancelled,
            total_requests: snapshot.iterations,
            transport_errors: snapshot.transport_errors,
            interrupted_iterations: snapshot.interrupted_iterations,
            checks_passed: snapshot.checks_passed,
            checks_failed: snapshot.checks_failed,
            checks: snapshot.checks,
            latency: latencies.summary(),
            peak_concurrency,
            final_concurrency,
        };

        info!(
            "Run {} done in {:.2}s: {} requests, {} checks passed, {} failed, {} transport errors",
            run_id,
            elapsed.as_secs_f64(),
            report.total_requests,
            report.checks_passed,
            report.checks_failed,
            report.transport_errors
        );

        report
    }

    fn publish(&self, state: DriverState, target: u32, active: usize) {
        metrics::gauge!("stageload_vus_target").set(target as f64);
        self.status_tx.send_replace(DriverStatus {
            state,
            target,
            active,
        });
    }

    fn log_transition(&self, next: DriverState) {
        match next {
            DriverState::Ramping { stage } => {
                let s = self.config.profile.stages()[stage];
                info!(
                    "Stage {}/{}: {} virtual users over {}",
                    stage + 1,
                    self.config.profile.len(),
                    s.target,
                    format_duration(s.duration)
                );
            }
            other => debug!("Driver state -> {}", other.name()),
        }
    }
}
