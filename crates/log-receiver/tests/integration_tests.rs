//! 통합 테스트 -- 실제 TCP 리스너에 HTTP 요청을 보내 전체 흐름을 검증합니다.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;

use httplog_core::config::ReceiverConfig;
use httplog_core::error::ConsumerError;
use httplog_core::pipeline::{BoxFuture, HealthStatus, LogConsumer, Pipeline};
use httplog_core::types::{AttributeValue, LogBatch, Timestamp};
use httplog_receiver::server::{HEADER_READ_TIMEOUT, SHUTDOWN_GRACE_PERIOD};
use httplog_receiver::{LogReceiver, LogReceiverBuilder, ReceiverError, ServerState};

/// 받은 배치를 모두 기록하는 소비자
#[derive(Default)]
struct SpyConsumer {
    calls: AtomicUsize,
    batches: Mutex<Vec<LogBatch>>,
}

impl LogConsumer for SpyConsumer {
    fn name(&self) -> &str {
        "spy"
    }

    fn consume(&self, batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(batch);
            Ok(())
        })
    }
}

/// 테스트가 풀어줄 때까지 배치를 붙잡고 있는 소비자
#[derive(Default)]
struct GateConsumer {
    entered: Notify,
    release: Notify,
    delivered: AtomicUsize,
}

impl LogConsumer for GateConsumer {
    fn name(&self) -> &str {
        "gate"
    }

    fn consume(&self, _batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>> {
        Box::pin(async move {
            self.entered.notify_one();
            self.release.notified().await;
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

async fn start_receiver(consumer: Arc<dyn LogConsumer>) -> (LogReceiver, SocketAddr) {
    let mut receiver = LogReceiverBuilder::new()
        .config(ReceiverConfig::new("127.0.0.1:0"))
        .consumer(consumer)
        .build()
        .expect("failed to build receiver");
    receiver.start().await.expect("failed to start receiver");
    let addr = receiver.local_addr().expect("receiver has no local address");
    (receiver, addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("failed to build client")
}

fn logs_url(addr: SocketAddr, format: Option<&str>) -> String {
    match format {
        Some(format) => format!("http://{addr}/logs?format={format}"),
        None => format!("http://{addr}/logs"),
    }
}

/// level/msg 레코드는 수신 시각이 찍혀 그대로 전달된다
#[tokio::test]
async fn test_json_record_is_stamped_and_forwarded() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let before = Timestamp::now();
    let response = client()
        .post(logs_url(addr, Some("json")))
        .body(r#"[{"level":"error","msg":"boom"}]"#)
        .send()
        .await
        .unwrap();
    let after = Timestamp::now();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Successfully processed logs\n");

    {
        let batches = spy.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].record_count(), 1);

        let record = batches[0].records().next().unwrap();
        let stamped = record.timestamp.unwrap();
        assert!(stamped >= before && stamped <= after);
        assert_eq!(record.attribute("level"), Some(&AttributeValue::from("error")));
        assert_eq!(record.attribute("msg"), Some(&AttributeValue::from("boom")));
    }

    receiver.shutdown().await.unwrap();
}

/// 명시된 타임스탬프는 나노초까지 보존된다
#[tokio::test]
async fn test_explicit_timestamp_is_preserved() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let response = client()
        .post(logs_url(addr, None))
        .body(r#"[{"timestamp":"2024-01-15T12:00:00.123456789Z","msg":"a"},{"msg":"b"}]"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    {
        let batches = spy.batches.lock().unwrap();
        let stamps: Vec<_> = batches[0]
            .records()
            .map(|r| r.timestamp.unwrap().as_unix_nanos())
            .collect();
        assert_eq!(stamps[0], 1_705_320_000_123_456_789);
        assert_ne!(stamps[1], stamps[0]);
    }

    receiver.shutdown().await.unwrap();
}

/// 해석할 수 없는 타임스탬프는 배치 전체를 거부한다
#[tokio::test]
async fn test_invalid_timestamp_rejects_batch() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let response = client()
        .post(logs_url(addr, Some("json")))
        .body(r#"[{"msg":"fine"},{"timestamp":"not-a-date","msg":"bad"}]"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(response.text().await.unwrap().starts_with("failed to decode json logs"));
    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

    receiver.shutdown().await.unwrap();
}

/// raw 본문은 바이트 그대로 레코드 하나가 된다
#[tokio::test]
async fn test_raw_body_is_forwarded_verbatim() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let payload: &[u8] = b"<34>Jan 15 12:00:00 host sshd: Failed password\n\xff";
    let response = client()
        .post(logs_url(addr, Some("raw")))
        .body(payload.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    {
        let batches = spy.batches.lock().unwrap();
        assert_eq!(batches[0].record_count(), 1);
        let record = batches[0].records().next().unwrap();
        assert_eq!(record.body.as_deref(), Some(payload));
        assert!(record.timestamp.is_some());
    }

    receiver.shutdown().await.unwrap();
}

/// 알 수 없는 형식은 디코딩, 전달 없이 400
#[tokio::test]
async fn test_unknown_format_never_reaches_consumer() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let response = client()
        .post(logs_url(addr, Some("xml")))
        .body("<log/>")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(
        response.text().await.unwrap(),
        "invalid format specified: xml\n"
    );
    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

    receiver.shutdown().await.unwrap();
}

/// 동시 요청은 서로 섞이지 않고 각각 정확히 한 번 전달된다
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_isolated() {
    const REQUESTS: usize = 64;

    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;
    let client = client();

    let mut handles = Vec::with_capacity(REQUESTS);
    for id in 0..REQUESTS {
        let client = client.clone();
        let url = logs_url(addr, Some("json"));
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .body(format!(r#"[{{"request":{id},"msg":"from {id}"}}]"#))
                .send()
                .await
                .map(|r| r.status())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 200);
    }

    {
        let batches = spy.batches.lock().unwrap();
        assert_eq!(batches.len(), REQUESTS);

        let mut seen: Vec<i64> = batches
            .iter()
            .map(|batch| {
                assert_eq!(batch.record_count(), 1);
                let record = batch.records().next().unwrap();
                let Some(AttributeValue::Int(id)) = record.attribute("request") else {
                    panic!("missing request id");
                };
                assert_eq!(
                    record.attribute("msg"),
                    Some(&AttributeValue::from(format!("from {id}")))
                );
                *id
            })
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..REQUESTS as i64).collect::<Vec<_>>());
    }

    receiver.shutdown().await.unwrap();
}

/// 종료 중에도 처리 중인 요청의 응답은 전달된다
#[tokio::test]
async fn test_shutdown_completes_in_flight_request() {
    let gate = Arc::new(GateConsumer::default());
    let (mut receiver, addr) = start_receiver(gate.clone()).await;

    let url = logs_url(addr, Some("json"));
    let request = tokio::spawn(async move {
        client()
            .post(url)
            .body(r#"[{"msg":"slow"}]"#)
            .send()
            .await
    });

    gate.entered.notified().await;

    let releaser = {
        let gate = gate.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            gate.release.notify_one();
        })
    };

    receiver.shutdown().await.unwrap();
    releaser.await.unwrap();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(gate.delivered.load(Ordering::SeqCst), 1);
    assert_eq!(receiver.state(), ServerState::Stopped);

    // 리스너는 이미 닫혔으므로 새 연결은 실패한다
    let refused = client()
        .post(logs_url(addr, None))
        .body("[]")
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(refused.is_err());
}

/// 유예 시간 안에 끝나지 않는 요청은 중단되고 shutdown은 반환된다
#[tokio::test]
async fn test_shutdown_aborts_requests_past_grace_period() {
    let gate = Arc::new(GateConsumer::default());
    let (mut receiver, addr) = start_receiver(gate.clone()).await;

    let url = logs_url(addr, Some("json"));
    let request = tokio::spawn(async move {
        client()
            .post(url)
            .body(r#"[{"msg":"stuck"}]"#)
            .send()
            .await
    });

    // 소비자는 끝내 풀려나지 않는다
    gate.entered.notified().await;

    let started = Instant::now();
    receiver.shutdown().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= SHUTDOWN_GRACE_PERIOD - Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < SHUTDOWN_GRACE_PERIOD + Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(receiver.state(), ServerState::Stopped);
    assert_eq!(gate.delivered.load(Ordering::SeqCst), 0);

    let outcome = request.await.unwrap();
    assert!(outcome.is_err(), "aborted request must not get a response");
}

/// 헤더를 보내다 멈춘 클라이언트는 헤더 읽기 시간 제한 후 끊긴다
#[tokio::test]
async fn test_stalled_headers_are_closed_after_timeout() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, addr) = start_receiver(spy.clone()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /logs HTTP/1.1\r\nHost: x\r\n")
        .await
        .unwrap();

    let started = Instant::now();
    let mut buf = Vec::new();
    let closed = tokio::time::timeout(
        HEADER_READ_TIMEOUT + Duration::from_secs(5),
        stream.read_to_end(&mut buf),
    )
    .await;
    let elapsed = started.elapsed();

    // 정상 종료든 리셋이든 연결이 닫히기만 하면 된다
    assert!(closed.is_ok(), "connection still open after {elapsed:?}");
    assert!(elapsed >= HEADER_READ_TIMEOUT - Duration::from_millis(500), "{elapsed:?}");
    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);

    receiver.shutdown().await.unwrap();
}

/// 이미 사용 중인 주소는 즉시 바인드 에러
#[tokio::test]
async fn test_bind_conflict_fails_fast() {
    let (mut first, addr) = start_receiver(Arc::new(SpyConsumer::default())).await;

    let mut second = LogReceiverBuilder::new()
        .config(ReceiverConfig::new(addr.to_string()))
        .consumer(Arc::new(SpyConsumer::default()))
        .build()
        .unwrap();

    let err = second.start().await.unwrap_err();
    assert!(matches!(err, ReceiverError::Bind { .. }));
    assert_eq!(second.state(), ServerState::Stopped);

    first.shutdown().await.unwrap();
}

/// shutdown은 여러 번 호출해도 안전하고, 정지 후 다시 시작할 수 있다
#[tokio::test]
async fn test_shutdown_is_idempotent_and_restartable() {
    let spy = Arc::new(SpyConsumer::default());
    let (mut receiver, _) = start_receiver(spy.clone()).await;

    receiver.shutdown().await.unwrap();
    receiver.shutdown().await.unwrap();
    assert_eq!(receiver.health_check().await, HealthStatus::Unhealthy("stopped".to_owned()));

    receiver.start().await.unwrap();
    assert_eq!(receiver.health_check().await, HealthStatus::Healthy);
    let addr = receiver.local_addr().unwrap();

    let response = client()
        .post(logs_url(addr, Some("raw")))
        .body("after restart")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(spy.calls.load(Ordering::SeqCst), 1);

    receiver.stop().await.unwrap();
    assert_eq!(receiver.state(), ServerState::Stopped);
}
