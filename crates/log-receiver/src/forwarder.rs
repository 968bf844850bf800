//! 다운스트림 전달
//!
//! 정규화된 배치를 [`LogConsumer`]에게 넘깁니다. 모든 요청 태스크가
//! 같은 소비자 핸들을 공유하므로 [`Forwarder`]는 복제 비용이 낮습니다.

use std::sync::Arc;

use tracing::{debug, error};

use httplog_core::metrics as m;
use httplog_core::pipeline::LogConsumer;
use httplog_core::types::LogBatch;

use crate::error::ReceiverError;

/// 소비자 전달기
#[derive(Clone)]
pub struct Forwarder {
    consumer: Arc<dyn LogConsumer>,
}

impl Forwarder {
    /// 새 전달기를 생성합니다.
    pub fn new(consumer: Arc<dyn LogConsumer>) -> Self {
        Self { consumer }
    }

    /// 소비자 이름
    pub fn consumer_name(&self) -> &str {
        self.consumer.name()
    }

    /// 배치를 소비자에게 전달하고 전달한 레코드 수를 반환합니다.
    ///
    /// 소비자 실패는 재시도하지 않고 호출자에게 그대로 돌려줍니다.
    pub async fn forward(&self, batch: LogBatch) -> Result<usize, ReceiverError> {
        let count = batch.record_count();

        match self.consumer.consume(batch).await {
            Ok(()) => {
                debug!(
                    consumer = self.consumer.name(),
                    records = count,
                    "forwarded log batch"
                );
                Ok(count)
            }
            Err(source) => {
                error!(
                    consumer = self.consumer.name(),
                    records = count,
                    error = %source,
                    "downstream consumer failed"
                );
                metrics::counter!(m::RECEIVER_FORWARD_ERRORS_TOTAL).increment(1);
                Err(ReceiverError::Forward {
                    consumer: self.consumer.name().to_owned(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("consumer", &self.consumer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use httplog_core::error::ConsumerError;
    use httplog_core::pipeline::BoxFuture;
    use httplog_core::types::{InstrumentationScope, LogRecord};

    use super::*;

    #[derive(Default)]
    struct RecordingConsumer {
        batches: Mutex<Vec<LogBatch>>,
        fail_with: Option<ConsumerError>,
    }

    impl LogConsumer for RecordingConsumer {
        fn name(&self) -> &str {
            "recording"
        }

        fn consume(&self, batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>> {
            Box::pin(async move {
                if let Some(err) = &self.fail_with {
                    return Err(err.clone());
                }
                self.batches.lock().unwrap().push(batch);
                Ok(())
            })
        }
    }

    fn batch_of(n: usize) -> LogBatch {
        LogBatch::single_scope(InstrumentationScope::default(), vec![LogRecord::new(); n])
    }

    #[tokio::test]
    async fn forward_delivers_batch_once() {
        let consumer = Arc::new(RecordingConsumer::default());
        let forwarder = Forwarder::new(consumer.clone());

        let forwarded = forwarder.forward(batch_of(3)).await.unwrap();

        assert_eq!(forwarded, 3);
        let batches = consumer.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].record_count(), 3);
    }

    #[tokio::test]
    async fn consumer_failure_is_surfaced() {
        let consumer = Arc::new(RecordingConsumer {
            fail_with: Some(ConsumerError::Unavailable("queue full".to_owned())),
            ..Default::default()
        });
        let forwarder = Forwarder::new(consumer);

        let err = forwarder.forward(batch_of(1)).await.unwrap_err();
        match err {
            ReceiverError::Forward { consumer, source } => {
                assert_eq!(consumer, "recording");
                assert!(matches!(source, ConsumerError::Unavailable(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn consumer_name_is_exposed() {
        let forwarder = Forwarder::new(Arc::new(RecordingConsumer::default()));
        assert_eq!(forwarder.consumer_name(), "recording");
        assert!(format!("{forwarder:?}").contains("recording"));
    }
}
