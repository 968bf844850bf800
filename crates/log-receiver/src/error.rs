//! 수신기 에러 타입
//!
//! [`ReceiverError`]는 HTTP 수신기 내부에서 발생하는 모든 에러를 표현합니다.
//! 요청 단위 에러는 [`ReceiverError::status_code`]로 HTTP 응답에 매핑되고,
//! 생명주기 에러는 `From<ReceiverError> for HttplogError`로 상위 레이어에 전파됩니다.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use httplog_core::error::{ConfigError, ConsumerError, DecodeError, HttplogError, PipelineError};

/// 수신기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// 엔드포인트 바인드 실패 (시작 시 치명적)
    #[error("failed to bind to {address}: {reason}")]
    Bind {
        /// 바인드하려던 주소
        address: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("invalid receiver config: {0}")]
    Config(#[from] ConfigError),

    /// 지원하지 않는 `format` 쿼리 값
    #[error("invalid format specified: {0}")]
    UnsupportedFormat(String),

    /// 본문 디코딩 실패
    #[error("failed to decode {format} logs: {source}")]
    Decode {
        /// 요청된 형식
        format: &'static str,
        /// 디코더 에러
        #[source]
        source: DecodeError,
    },

    /// 본문이 최대 크기를 초과함
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// 허용 크기 (바이트)
        limit: usize,
    },

    /// 본문 읽기 실패
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// 다운스트림 소비자 실패
    #[error("failed to forward logs to {consumer}: {source}")]
    Forward {
        /// 소비자 이름
        consumer: String,
        /// 소비자 에러
        #[source]
        source: ConsumerError,
    },

    /// 요청 처리 시간 초과
    #[error("request processing exceeded {0:?}")]
    Timeout(std::time::Duration),

    /// 연결 수준 I/O 에러 (진단 로그로만 보고됨)
    #[error("transport error: {0}")]
    Transport(String),

    /// 현재 상태에서 허용되지 않는 생명주기 호출
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// 시도한 동작
        operation: &'static str,
        /// 현재 상태
        state: String,
    },

    /// 빌더에 소비자가 설정되지 않음
    #[error("downstream consumer is not set")]
    MissingConsumer,
}

impl ReceiverError {
    /// 요청 단위 에러에 대응하는 HTTP 상태 코드
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedFormat(_) | Self::Decode { .. } | Self::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Forward {
                source: ConsumerError::Unavailable(_),
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Forward { .. }
            | Self::Bind { .. }
            | Self::Config(_)
            | Self::Transport(_)
            | Self::InvalidState { .. }
            | Self::MissingConsumer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 메트릭 `result` 레이블 값
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Decode { .. } => "decode_error",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::BodyRead(_) => "body_read_error",
            Self::Forward { .. } => "forward_error",
            Self::Timeout(_) => "timeout",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ReceiverError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{self}\n")).into_response()
    }
}

impl From<ReceiverError> for HttplogError {
    fn from(err: ReceiverError) -> Self {
        match err {
            ReceiverError::Config(e) => HttplogError::Config(e),
            ReceiverError::Decode { source, .. } => HttplogError::Decode(source),
            ReceiverError::Forward { source, .. } => HttplogError::Consumer(source),
            ReceiverError::InvalidState {
                operation: "start",
                ..
            } => HttplogError::Pipeline(PipelineError::AlreadyRunning),
            other => HttplogError::Pipeline(PipelineError::StartFailed(other.to_string())),
        }
    }
}
