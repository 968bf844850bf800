//! HTTP 서버 생명주기 관리
//!
//! [`LogReceiver`]는 리스너 바인드, 연결 수락 루프, graceful shutdown을 담당합니다.
//!
//! # 상태 전이
//! ```text
//! Stopped -> Starting -> Running -> ShuttingDown -> Stopped
//!              |
//!              +-- (bind 실패) --> Stopped
//! ```
//!
//! # 연결 처리
//! 수락한 연결마다 tokio 태스크 하나를 생성하고 hyper HTTP/1 연결로 처리합니다.
//! 동시 연결 수는 [`MAX_CONNECTIONS`]로 제한되며, 초과 연결은 즉시 닫힙니다.
//!
//! # 종료
//! 수락 루프를 취소해 리스너를 닫고, 열린 연결에 graceful shutdown을 요청한 뒤
//! [`SHUTDOWN_GRACE_PERIOD`]만큼 기다립니다. 그 뒤에도 남은 연결은 중단합니다.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info, warn};

use httplog_core::config::ReceiverConfig;
use httplog_core::error::HttplogError;
use httplog_core::metrics as m;
use httplog_core::pipeline::{HealthStatus, LogConsumer, Pipeline};

use crate::decoder::DecoderRegistry;
use crate::dispatcher::{ReceiverState, router};
use crate::error::ReceiverError;
use crate::forwarder::Forwarder;

/// 요청 헤더를 모두 읽기까지의 제한 시간
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// 종료 시 열린 연결이 끝나기를 기다리는 최대 시간
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// 최대 동시 연결 수
pub const MAX_CONNECTIONS: usize = 1024;

/// 수락 실패 후 다시 시도하기 전 대기 시간
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 서버 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// 정지됨 (초기 상태)
    Stopped,
    /// 바인드 중
    Starting,
    /// 연결 수락 중
    Running,
    /// 열린 연결 정리 중
    ShuttingDown,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// HTTP 로그 수신기
///
/// # 사용 예시
/// ```ignore
/// use httplog_receiver::LogReceiverBuilder;
///
/// let mut receiver = LogReceiverBuilder::new()
///     .config(config.receiver.clone())
///     .consumer(consumer)
///     .build()?;
///
/// receiver.start().await?;
/// // ...
/// receiver.shutdown().await?;
/// ```
pub struct LogReceiver {
    config: ReceiverConfig,
    decoders: Arc<DecoderRegistry>,
    forwarder: Forwarder,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    cancel_token: Option<CancellationToken>,
    server_task: Option<JoinHandle<()>>,
}

impl LogReceiver {
    /// 현재 상태
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// 실제로 바인드된 주소. 실행 중일 때만 `Some`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 수신기 설정
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// 리스너를 바인드하고 수락 루프를 백그라운드 태스크로 시작합니다.
    ///
    /// `Stopped` 상태에서만 호출할 수 있습니다. 바인드에 실패하면
    /// [`ReceiverError::Bind`]를 반환하고 `Stopped`로 돌아갑니다.
    pub async fn start(&mut self) -> Result<(), ReceiverError> {
        if self.state != ServerState::Stopped {
            return Err(ReceiverError::InvalidState {
                operation: "start",
                state: self.state.to_string(),
            });
        }

        self.config.validate()?;
        self.state = ServerState::Starting;

        let address = self.config.bind_address();
        let listener = match bind(&address).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state = ServerState::Stopped;
                error!(address = %address, error = %e, "failed to start log receiver");
                return Err(e);
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.state = ServerState::Stopped;
                return Err(ReceiverError::Bind {
                    address,
                    reason: e.to_string(),
                });
            }
        };

        let cancel_token = CancellationToken::new();
        let app = router(ReceiverState::new(
            Arc::clone(&self.decoders),
            self.forwarder.clone(),
        ));
        let task = tokio::spawn(serve(listener, app, cancel_token.clone()));

        self.cancel_token = Some(cancel_token);
        self.server_task = Some(task);
        self.local_addr = Some(local_addr);
        self.state = ServerState::Running;

        info!(
            address = %local_addr,
            consumer = self.forwarder.consumer_name(),
            formats = ?self.decoders.registered_formats(),
            "log receiver started"
        );
        Ok(())
    }

    /// 수신기를 정지합니다.
    ///
    /// 새 연결 수락을 즉시 멈추고, 처리 중인 요청은 유예 시간 안에서 마무리합니다.
    /// 이미 정지된 경우 아무 것도 하지 않습니다. 정지 후 다시 시작할 수 있습니다.
    pub async fn shutdown(&mut self) -> Result<(), ReceiverError> {
        if self.state == ServerState::Stopped {
            return Ok(());
        }

        info!("shutting down log receiver");
        self.state = ServerState::ShuttingDown;

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let result = match self.server_task.take() {
            Some(task) => task.await.map_err(|e| {
                error!(error = %e, "log receiver task failed");
                ReceiverError::Transport(e.to_string())
            }),
            None => Ok(()),
        };

        self.local_addr = None;
        self.state = ServerState::Stopped;
        info!("log receiver stopped");
        result
    }
}

impl Pipeline for LogReceiver {
    async fn start(&mut self) -> Result<(), HttplogError> {
        LogReceiver::start(self).await.map_err(HttplogError::from)
    }

    async fn stop(&mut self) -> Result<(), HttplogError> {
        self.shutdown().await.map_err(HttplogError::from)
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ServerState::Running => HealthStatus::Healthy,
            ServerState::ShuttingDown => HealthStatus::Degraded("shutting down".to_owned()),
            ServerState::Starting => HealthStatus::Unhealthy("starting".to_owned()),
            ServerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

impl Drop for LogReceiver {
    fn drop(&mut self) {
        if let Some(token) = &self.cancel_token {
            token.cancel();
        }
    }
}

async fn bind(address: &str) -> Result<TcpListener, ReceiverError> {
    TcpListener::bind(address)
        .await
        .map_err(|e| ReceiverError::Bind {
            address: address.to_owned(),
            reason: e.to_string(),
        })
}

/// 피어 쪽에서 끊긴 연결로 인한 수락 실패 (로그 불필요)
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
    )
}

/// 열린 연결 gauge를 연결 태스크 수명과 맞춥니다 (중단된 태스크 포함).
struct ConnectionGuard;

impl ConnectionGuard {
    fn open() -> Self {
        metrics::gauge!(m::RECEIVER_OPEN_CONNECTIONS).increment(1.0);
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::gauge!(m::RECEIVER_OPEN_CONNECTIONS).decrement(1.0);
    }
}

/// 연결 수락 루프
///
/// 취소되면 리스너를 닫고 열린 연결을 정리한 뒤 반환합니다.
async fn serve(listener: TcpListener, app: Router, cancel_token: CancellationToken) {
    let mut http = http1::Builder::new();
    http.timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT);

    let limiter = Arc::new(Semaphore::new(MAX_CONNECTIONS));
    let mut connections = JoinSet::new();

    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel_token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) if is_connection_error(&e) => continue,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    metrics::counter!(m::RECEIVER_ACCEPT_ERRORS_TOTAL).increment(1);
                    tokio::select! {
                        _ = cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => continue,
                    }
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "connection task panicked");
                    }
                }
                continue;
            }
        };

        let permit = match limiter.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(peer = %peer, max = MAX_CONNECTIONS, "max connections reached, closing connection");
                drop(stream);
                continue;
            }
        };

        debug!(peer = %peer, "accepted connection");

        let tower_service = app.clone();
        let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
            tower_service.clone().call(request)
        });
        let conn = http.serve_connection(TokioIo::new(stream), service);
        let cancel = cancel_token.clone();

        connections.spawn(async move {
            let _permit = permit;
            let _guard = ConnectionGuard::open();
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = cancel.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(e) = result {
                let err = ReceiverError::Transport(e.to_string());
                debug!(peer = %peer, error = %err, "connection closed with error");
            }
        });
    }

    drop(listener);

    if !connections.is_empty() {
        info!(
            connections = connections.len(),
            "waiting for open connections to finish"
        );
    }

    let drained = tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = connections.len(),
            grace_period = ?SHUTDOWN_GRACE_PERIOD,
            "grace period elapsed, aborting remaining connections"
        );
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}

/// 로그 수신기 빌더
pub struct LogReceiverBuilder {
    config: ReceiverConfig,
    consumer: Option<Arc<dyn LogConsumer>>,
    decoders: DecoderRegistry,
}

impl LogReceiverBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ReceiverConfig::default(),
            consumer: None,
            decoders: DecoderRegistry::default(),
        }
    }

    /// 수신기 설정을 지정합니다.
    pub fn config(mut self, config: ReceiverConfig) -> Self {
        self.config = config;
        self
    }

    /// 다운스트림 소비자를 지정합니다 (필수).
    pub fn consumer(mut self, consumer: Arc<dyn LogConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// 디코더 레지스트리를 교체합니다.
    pub fn decoders(mut self, decoders: DecoderRegistry) -> Self {
        self.decoders = decoders;
        self
    }

    /// 수신기를 빌드합니다.
    ///
    /// 설정이 유효하지 않거나 소비자가 없으면 실패합니다.
    pub fn build(self) -> Result<LogReceiver, ReceiverError> {
        self.config.validate()?;
        let consumer = self.consumer.ok_or(ReceiverError::MissingConsumer)?;

        Ok(LogReceiver {
            config: self.config,
            decoders: Arc::new(self.decoders),
            forwarder: Forwarder::new(consumer),
            state: ServerState::Stopped,
            local_addr: None,
            cancel_token: None,
            server_task: None,
        })
    }
}

impl Default for LogReceiverBuilder {
    fn default() -> Self {
        Self::new()
    }
}
