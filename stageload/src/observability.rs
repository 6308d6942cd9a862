//! Prometheus metrics exporter
//!
//! Counters and gauges are recorded through the `metrics` facade wherever
//! they happen (stats aggregator, VU pool, driver). When a metrics address
//! is configured, the recorder is installed and rendered on `GET /metrics`.
//!
//! | Metric | Kind |
//! |---|---|
//! | `stageload_requests_total` | counter |
//! | `stageload_transport_errors_total{kind}` | counter |
//! | `stageload_checks_total{check,result}` | counter |
//! | `stageload_request_duration_seconds` | histogram |
//! | `stageload_vus_active` | gauge |
//! | `stageload_vus_target` | gauge |

use std::net::SocketAddr;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

/// Router exposing `GET /metrics` in Prometheus text format
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
        .layer(TraceLayer::new_for_http())
}

/// Serve the metrics router until the process exits
pub async fn serve_metrics(addr: SocketAddr, handle: PrometheusHandle) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics listening on http://{}/metrics", listener.local_addr()?);
    axum::serve(listener, metrics_router(handle)).await
}
