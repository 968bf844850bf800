//! CLI argument definitions for httplog-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use httplog_core::config::HttplogConfig;
use httplog_core::error::{ConfigError, HttplogError};

/// HTTP log ingestion daemon.
///
/// Accepts log batches on `POST /logs`, stamps missing timestamps and
/// hands every batch to the downstream consumer.
#[derive(Parser, Debug)]
#[command(name = "httplog-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to httplog.toml configuration file.
    ///
    /// A missing file is not an error: built-in defaults are used instead.
    #[arg(short, long, default_value = "httplog.toml")]
    pub config: PathBuf,

    /// Override the listen endpoint (e.g. ":8888", "127.0.0.1:9000").
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file.
    File(PathBuf),
    /// The file was missing; built-in defaults were used.
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

impl DaemonCli {
    /// Load the effective configuration.
    ///
    /// Precedence: CLI flags, then environment variables, then the config
    /// file, then defaults. The result is validated.
    pub async fn load_config(&self) -> Result<(HttplogConfig, ConfigSource)> {
        let (mut config, source) = match HttplogConfig::read_file(&self.config).await {
            Ok(config) => (config, ConfigSource::File(self.config.clone())),
            Err(HttplogError::Config(ConfigError::FileNotFound { .. })) => {
                (HttplogConfig::default(), ConfigSource::Defaults)
            }
            Err(e) => return Err(anyhow::anyhow!("failed to load config: {}", e)),
        };

        config.apply_env_overrides();
        self.apply_overrides(&mut config);

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        Ok((config, source))
    }

    /// Apply CLI overrides on top of an already loaded configuration.
    pub fn apply_overrides(&self, config: &mut HttplogConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.receiver.endpoint = endpoint.clone();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
    }
}
