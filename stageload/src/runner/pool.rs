//! Virtual-user pool
//!
//! Each virtual user is a tokio task looping request → checks → think time.
//! The pool grows by spawning users and shrinks by retiring the most recently
//! started ones. A retired user finishes its in-flight iteration and exits
//! without starting another; nothing is aborted mid-request unless draining
//! runs past its graceful-stop window.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::check::{Check, RequestOutcome, evaluate_checks};
use crate::client::RequestExecutor;
use crate::stats::RunStats;

/// Pause between iterations of one virtual user
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ThinkTime {
    pub base: Duration,
    pub jitter: Duration,
}

impl ThinkTime {
    /// `base` plus a uniform random share of `jitter`
    pub fn next_pause(&self) -> Duration {
        if self.jitter.is_zero() {
            self.base
        } else {
            self.base.saturating_add(self.jitter.mul_f64(rand::random::<f64>()))
        }
    }
}

/// Everything a virtual user needs, shared by all of them
pub(crate) struct VuContext {
    pub executor: Arc<dyn RequestExecutor>,
    pub checks: Vec<Check>,
    pub stats: Arc<RunStats>,
    pub latency_tx: mpsc::Sender<Duration>,
    pub think_time: ThinkTime,
}

impl VuContext {
    /// One request, one evaluation of the check set
    async fn run_iteration(&self, vu: u64) {
        let started = Instant::now();
        let outcome = match self.executor.execute().await {
            Ok(outcome) => {
                let latency = started.elapsed();
                metrics::histogram!("stageload_request_duration_seconds")
                    .record(latency.as_secs_f64());
                // Collector only goes away after every VU has exited
                let _ = self.latency_tx.send(latency).await;
                outcome
            }
            Err(e) => {
                debug!(vu, error = %e, "Transport error");
                self.stats.record_transport_error(&e);
                RequestOutcome::transport_failure()
            }
        };

        let results = evaluate_checks(&self.checks, &outcome);
        self.stats.record_results(&results);
        self.stats.record_iteration();
    }
}

async fn run_virtual_user(
    id: u64,
    ctx: Arc<VuContext>,
    mut retire: watch::Receiver<bool>,
    mut stop: watch::Receiver<bool>,
) {
    debug!(vu = id, "Virtual user started");

    loop {
        if *retire.borrow() || *stop.borrow() {
            break;
        }

        ctx.run_iteration(id).await;

        let pause = ctx.think_time.next_pause();
        if pause.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = retire.changed() => {}
            _ = stop.changed() => {}
        }
    }

    debug!(vu = id, "Virtual user stopped");
}

struct VirtualUser {
    id: u64,
    retire: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Set of running virtual users, resized by the driver on every tick
pub(crate) struct VuPool {
    ctx: Arc<VuContext>,
    stop: watch::Receiver<bool>,
    /// Running users, oldest first
    active: Vec<VirtualUser>,
    /// Users told to stop that may still be finishing an iteration
    retiring: Vec<JoinHandle<()>>,
    next_id: u64,
    peak: usize,
}

impl VuPool {
    pub fn new(ctx: Arc<VuContext>, stop: watch::Receiver<bool>) -> Self {
        Self {
            ctx,
            stop,
            active: Vec::new(),
            retiring: Vec::new(),
            next_id: 0,
            peak: 0,
        }
    }

    /// Users currently running, excluding retired ones
    pub fn active(&self) -> usize {
        self.active.len()
    }

    /// Highest `active` count seen so far
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Spawn or retire users until exactly `target` are active
    pub fn scale_to(&mut self, target: usize) {
        while self.active.len() < target {
            let id = self.next_id;
            self.next_id += 1;

            let (retire, retire_rx) = watch::channel(false);
            let handle = tokio::spawn(run_virtual_user(
                id,
                Arc::clone(&self.ctx),
                retire_rx,
                self.stop.clone(),
            ));
            self.active.push(VirtualUser { id, retire, handle });
        }

        while self.active.len() > target {
            if let Some(vu) = self.active.pop() {
                debug!(vu = vu.id, "Retiring virtual user");
                vu.retire.send_replace(true);
                self.retiring.push(vu.handle);
            }
        }

        self.retiring.retain(|handle| !handle.is_finished());
        self.peak = self.peak.max(self.active.len());
        metrics::gauge!("stageload_vus_active").set(self.active.len() as f64);
    }

    /// Retire everyone and wait up to `graceful_stop` for them to exit
    ///
    /// Users still busy after the window are aborted; returns how many.
    pub async fn drain(&mut self, graceful_stop: Duration) -> u64 {
        for vu in self.active.drain(..) {
            vu.retire.send_replace(true);
            self.retiring.push(vu.handle);
        }
        metrics::gauge!("stageload_vus_active").set(0.0);

        let handles = std::mem::take(&mut self.retiring);
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        match tokio::time::timeout(graceful_stop, join_all(handles)).await {
            Ok(results) => {
                for err in results.into_iter().filter_map(Result::err) {
                    if err.is_panic() {
                        warn!("Virtual user panicked: {}", err);
                    }
                }
                0
            }
            Err(_) => {
                let mut interrupted = 0;
                for abort in aborts.iter().filter(|a| !a.is_finished()) {
                    abort.abort();
                    interrupted += 1;
                }
                interrupted
            }
        }
    }
}
