//! httplog daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `httplog-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod consumer;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
