//! Integration Tests for Stageload
//!
//! These tests run short real-time profiles through the reqwest executor
//! against a local stub target, testing the driver as a whole rather than
//! individual units.

use std::sync::Arc;

use stageload::config::Config;
use stageload::{DriverState, HttpExecutor, Stage, StagedDriver};

mod common;
use common::*;

// ============================================================================
// Full runs against a healthy target
// ============================================================================

mod healthy_target {
    use super::*;

    #[tokio::test]
    async fn test_ramp_up_and_down_passes_every_check() {
        let (addr, target) = spawn_target().await;
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());
        let config = load_config(vec![Stage::new(3, millis(600)), Stage::new(0, millis(300))]);

        let driver = StagedDriver::new(config, executor).unwrap();
        let status = driver.subscribe();
        let report = driver.run().await;

        assert!(!report.cancelled);
        assert!(report.total_requests > 0);
        assert_eq!(report.checks_failed, 0);
        assert_eq!(report.checks_passed, report.total_requests * 2);
        assert_eq!(report.transport_errors, 0);
        assert_eq!(report.peak_concurrency, 3);
        assert_eq!(report.final_concurrency, 0);
        assert_eq!(target.hits(), report.total_requests);
        assert!(report.elapsed >= millis(900));
        assert!(report.latency.is_some());
        assert_eq!(status.borrow().state, DriverState::Done);
    }

    #[tokio::test]
    async fn test_missing_proxy_header_fails_only_that_check() {
        let (addr, target) = spawn_target().await;
        target.set_proxied(false);
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());

        let report = StagedDriver::new(load_config(vec![Stage::new(2, millis(500))]), executor)
            .unwrap()
            .run()
            .await;

        assert!(report.total_requests > 0);
        assert_eq!(report.checks_passed, report.total_requests);
        assert_eq!(report.checks_failed, report.total_requests);
        let status = &report.checks[0];
        let proxied = &report.checks[1];
        assert_eq!(status.failed, 0);
        assert_eq!(proxied.passed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_a_long_run() {
        let (addr, _target) = spawn_target().await;
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());
        let config = load_config(vec![Stage::new(2, std::time::Duration::from_secs(300))]);

        let report = StagedDriver::new(config, executor)
            .unwrap()
            .run_until(tokio::time::sleep(millis(400)))
            .await;

        assert!(report.cancelled);
        assert!(report.total_requests > 0);
        assert!(report.elapsed < std::time::Duration::from_secs(5));
        assert_eq!(report.final_concurrency, 0);
    }
}

// ============================================================================
// Failing targets never abort the schedule
// ============================================================================

mod failing_target {
    use super::*;

    #[tokio::test]
    async fn test_404_fails_checks_and_run_continues() {
        let (addr, target) = spawn_target().await;
        target.set_status(404);
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());

        let report = StagedDriver::new(load_config(vec![Stage::new(2, millis(500))]), executor)
            .unwrap()
            .run()
            .await;

        assert!(report.total_requests > 0);
        assert_eq!(report.checks[0].passed, 0);
        assert_eq!(report.checks[0].failed, report.total_requests);
        assert!(!report.all_checks_passed());
        assert!(report.elapsed >= millis(500));
    }

    #[tokio::test]
    async fn test_status_flip_mid_run_is_counted() {
        let (addr, target) = spawn_target().await;
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());

        let flipper = {
            let target = Arc::clone(&target);
            tokio::spawn(async move {
                tokio::time::sleep(millis(300)).await;
                target.set_status(503);
            })
        };

        let report = StagedDriver::new(load_config(vec![Stage::new(2, millis(700))]), executor)
            .unwrap()
            .run()
            .await;
        flipper.await.unwrap();

        let status = &report.checks[0];
        assert!(status.passed > 0);
        assert!(status.failed > 0);
        assert_eq!(status.passed + status.failed, report.total_requests);
    }

    #[tokio::test]
    async fn test_unreachable_target_records_transport_errors() {
        let addr = closed_addr().await;
        let executor = Arc::new(HttpExecutor::new(&request_config(addr)).unwrap());

        let report = StagedDriver::new(load_config(vec![Stage::new(2, millis(400))]), executor)
            .unwrap()
            .run()
            .await;

        assert!(report.total_requests > 0);
        assert_eq!(report.transport_errors, report.total_requests);
        assert_eq!(report.checks_passed, 0);
        assert!(report.latency.is_none());
        assert!(report.elapsed >= millis(400));
    }
}

// ============================================================================
// Configuration through to a finished run
// ============================================================================

mod configured_run {
    use super::*;

    #[tokio::test]
    async fn test_json_config_drives_a_run() {
        let (addr, target) = spawn_target().await;
        let json = format!(
            r#"{{
                "target_url": "http://{addr}/",
                "policy": "linear",
                "stages": [
                    {{ "target": 4, "duration": "400ms" }},
                    {{ "target": 0, "duration": "400ms" }}
                ],
                "checks": [
                    {{ "name": "ok", "type": "status_in_range", "min": 200, "max": 299 }},
                    {{ "name": "proxied", "type": "header_present", "header": "x-beamlit-proxy" }}
                ],
                "think_time": "10ms",
                "tick_interval": "50ms",
                "report": {{ "format": "json" }}
            }}"#
        );

        let config = Config::from_json_str(&json).unwrap();
        config.validate().unwrap();
        let executor = Arc::new(HttpExecutor::new(&config.request).unwrap());
        let report = StagedDriver::new(config.load, executor).unwrap().run().await;

        assert!(report.total_requests > 0);
        assert!(report.all_checks_passed());
        assert_eq!(report.checks.len(), 2);
        assert!(report.peak_concurrency <= 4);
        assert_eq!(target.hits(), report.total_requests);

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["policy"], "linear");
        assert_eq!(json["stages"], 2);
    }

    #[tokio::test]
    async fn test_env_style_overrides_drive_a_run() {
        let (addr, _target) = spawn_target().await;
        let url = format!("http://{}/", addr);

        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                "TARGET_URL" => Some(url.clone()),
                "STAGES" => Some("2:300ms,0:200ms".to_string()),
                "RAMP_POLICY" => Some("step".to_string()),
                "THINK_TIME" => Some("10ms".to_string()),
                _ => None,
            })
            .unwrap();
        config.validate().unwrap();

        let executor = Arc::new(HttpExecutor::new(&config.request).unwrap());
        let report = StagedDriver::new(config.load, executor).unwrap().run().await;

        assert_eq!(report.stages, 2);
        assert_eq!(report.peak_concurrency, 2);
        assert!(report.all_checks_passed());
    }
}
