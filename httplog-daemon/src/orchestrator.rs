//! Daemon orchestration -- receiver assembly and lifecycle management.
//!
//! The [`Orchestrator`] owns the validated configuration and the
//! [`LogReceiver`]. It installs the metrics recorder when enabled, starts the
//! receiver, waits for a shutdown signal and then stops the receiver
//! gracefully so in-flight requests still get their responses.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use httplog_core::config::HttplogConfig;
use httplog_core::pipeline::{HealthStatus, LogConsumer, Pipeline};
use httplog_receiver::{LogReceiver, LogReceiverBuilder};

use crate::consumer::TracingConsumer;
use crate::metrics_server;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: HttplogConfig,
    /// The HTTP log receiver.
    receiver: LogReceiver,
}

impl Orchestrator {
    /// Load configuration from a file and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = HttplogConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration with the default
    /// [`TracingConsumer`].
    pub fn build_from_config(config: HttplogConfig) -> Result<Self> {
        Self::build_with_consumer(config, Arc::new(TracingConsumer::new()))
    }

    /// Build from an already-loaded configuration with a custom consumer.
    ///
    /// Installs the metrics recorder first when `[metrics]` is enabled.
    pub fn build_with_consumer(
        config: HttplogConfig,
        consumer: Arc<dyn LogConsumer>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let receiver = LogReceiverBuilder::new()
            .config(config.receiver.clone())
            .consumer(consumer)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log receiver: {}", e))?;

        Ok(Self { config, receiver })
    }

    /// Start the receiver.
    pub async fn start(&mut self) -> Result<()> {
        self.receiver
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start log receiver: {}", e))
    }

    /// Gracefully stop the receiver. Safe to call more than once.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping log receiver");
        self.receiver
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop log receiver: {}", e))
    }

    /// Start the receiver and block until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        tracing::info!("entering main loop");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal = signal, "shutdown signal received");

        self.shutdown().await
    }

    /// Current receiver health.
    pub async fn health(&self) -> HealthStatus {
        self.receiver.health_check().await
    }

    /// Address the receiver is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.receiver.local_addr()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &HttplogConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
    Ok("Ctrl-C")
}
