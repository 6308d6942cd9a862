//! Common Test Utilities for Integration Tests
//!
//! A stub target server whose response status can be changed while a run is
//! in progress, plus helpers for building short real-time runs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::get,
};
use stageload::config::{LoadConfig, RequestConfig};
use stageload::{Check, RampPolicy, RampProfile, Stage};

/// Shared state of the stub target
#[derive(Default)]
pub struct TargetState {
    status: AtomicU16,
    proxied: AtomicBool,
    hits: AtomicU64,
}

impl TargetState {
    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn set_proxied(&self, proxied: bool) {
        self.proxied.store(proxied, Ordering::SeqCst);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn respond(State(state): State<Arc<TargetState>>) -> (StatusCode, HeaderMap, &'static str) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let status =
        StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK);

    let mut headers = HeaderMap::new();
    if state.proxied.load(Ordering::SeqCst) {
        headers.insert("X-Beamlit-Proxy", HeaderValue::from_static("true"));
    }
    (status, headers, "It works!")
}

/// Start a stub target answering 200 with `X-Beamlit-Proxy: true`
pub async fn spawn_target() -> (SocketAddr, Arc<TargetState>) {
    let state = Arc::new(TargetState::default());
    state.set_status(200);
    state.set_proxied(true);

    let app = Router::new()
        .route("/", get(respond))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn request_config(addr: SocketAddr) -> RequestConfig {
    RequestConfig {
        url: format!("http://{}/", addr),
        timeout: Duration::from_secs(2),
        ..RequestConfig::default()
    }
}

/// Status-200 plus proxy-header checks over a short profile
pub fn load_config(stages: Vec<Stage>) -> LoadConfig {
    LoadConfig {
        profile: RampProfile::new(stages).unwrap(),
        policy: RampPolicy::Step,
        checks: vec![
            Check::status_equals("http response status code is 200", 200),
            Check::header_equals("http response is proxied", "X-Beamlit-Proxy", "true"),
        ],
        think_time: Duration::from_millis(20),
        graceful_stop: Duration::from_secs(2),
        tick_interval: Duration::from_millis(50),
        ..LoadConfig::default()
    }
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
