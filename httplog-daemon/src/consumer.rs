//! Default downstream consumer for the daemon.
//!
//! [`TracingConsumer`] emits one structured `info` event per record, so the
//! daemon's log output is the ingestion sink.

use tracing::info;

use httplog_core::error::ConsumerError;
use httplog_core::pipeline::{BoxFuture, LogConsumer};
use httplog_core::types::{LogBatch, LogRecord};

/// Tracing target used for ingested records.
pub const RECORD_TARGET: &str = "httplog::record";

/// Writes every received record to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsumer;

impl TracingConsumer {
    /// Create a new consumer.
    pub fn new() -> Self {
        Self
    }

    fn emit(record: &LogRecord) {
        let timestamp = record
            .timestamp
            .map(|t| t.to_string())
            .unwrap_or_default();
        let attributes = serde_json::to_string(&record.attributes).unwrap_or_default();
        let body = record.body_text().unwrap_or_default();

        info!(
            target: RECORD_TARGET,
            timestamp = %timestamp,
            attributes = %attributes,
            body = %body,
            "log record"
        );
    }
}

impl LogConsumer for TracingConsumer {
    fn name(&self) -> &str {
        "tracing"
    }

    fn consume(&self, batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>> {
        Box::pin(async move {
            for record in batch.records() {
                Self::emit(record);
            }
            Ok(())
        })
    }
}
