use std::sync::Arc;

use stageload::config::Config;
use stageload::observability::{install_recorder, serve_metrics};
use stageload::profile::format_duration;
use stageload::report;
use stageload::{HttpExecutor, StagedDriver};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stageload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration errors stop us before any request is issued
    let config = Config::load()?;
    info!(
        "Loaded configuration: target={}, stages={}, duration={}, policy={}, checks={}",
        config.request.url,
        config.load.profile.len(),
        format_duration(config.load.profile.total_duration()),
        config.load.policy,
        config.load.checks.len()
    );

    if let Some(addr) = config.metrics_addr {
        let handle = install_recorder()?;
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(addr, handle).await {
                error!("Metrics server failed: {}", e);
            }
        });
    }

    let executor = Arc::new(HttpExecutor::new(&config.request)?);
    let driver = StagedDriver::new(config.load, executor)?;

    let run = driver.run_until(shutdown_signal()).await;

    report::emit(&run, &config.report)?;

    if !run.all_checks_passed() {
        warn!(
            "{} of {} checks failed ({:.1}% pass rate)",
            run.checks_failed,
            run.checks_total(),
            run.pass_rate() * 100.0
        );
    }

    Ok(())
}
