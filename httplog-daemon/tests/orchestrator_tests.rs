//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> receiver build -> start -> request -> shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use httplog_core::config::HttplogConfig;
use httplog_core::error::ConsumerError;
use httplog_core::pipeline::{BoxFuture, HealthStatus, LogConsumer};
use httplog_core::types::LogBatch;
use httplog_daemon::orchestrator::Orchestrator;

#[derive(Default)]
struct CountingConsumer {
    records: AtomicUsize,
}

impl LogConsumer for CountingConsumer {
    fn name(&self) -> &str {
        "counting"
    }

    fn consume(&self, batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>> {
        Box::pin(async move {
            self.records.fetch_add(batch.record_count(), Ordering::SeqCst);
            Ok(())
        })
    }
}

fn local_config() -> HttplogConfig {
    HttplogConfig::parse(
        r#"
[general]
log_level = "info"

[receiver]
endpoint = "127.0.0.1:0"

[metrics]
enabled = false
"#,
    )
    .expect("failed to parse test config")
}

#[tokio::test]
async fn test_orchestrator_lifecycle() {
    let consumer = Arc::new(CountingConsumer::default());
    let mut orchestrator =
        Orchestrator::build_with_consumer(local_config(), consumer.clone()).unwrap();

    assert!(orchestrator.health().await.is_unhealthy());
    assert!(orchestrator.local_addr().is_none());

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.health().await, HealthStatus::Healthy);
    let addr = orchestrator.local_addr().unwrap();

    let response = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .post(format!("http://{addr}/logs"))
        .body(r#"[{"msg":"one"},{"msg":"two"}]"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(consumer.records.load(Ordering::SeqCst), 2);

    orchestrator.shutdown().await.unwrap();
    orchestrator.shutdown().await.unwrap();
    assert!(orchestrator.health().await.is_unhealthy());
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    let mut config = local_config();
    config.receiver.endpoint = "nowhere".to_owned();

    let result = Orchestrator::build_from_config(config);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_build_from_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = Orchestrator::build(&dir.path().join("absent.toml")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_is_exposed() {
    let orchestrator = Orchestrator::build_from_config(local_config()).unwrap();
    assert_eq!(orchestrator.config().receiver.endpoint, "127.0.0.1:0");
}
