//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 수신기는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `httplog_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(httplog_core::metrics::RECEIVER_RECORDS_FORWARDED_TOTAL).increment(3);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 와이어 형식 레이블 키 (json, raw)
pub const LABEL_FORMAT: &str = "format";

/// 결과 레이블 키 (success, unsupported_format, decode_error, forward_error, ...)
pub const LABEL_RESULT: &str = "result";

// ─── Receiver 메트릭 ────────────────────────────────────────────────

/// 처리된 HTTP 요청 수 (counter, labels: format, result)
pub const RECEIVER_REQUESTS_TOTAL: &str = "httplog_receiver_requests_total";

/// 소비자에게 전달된 레코드 수 (counter, label: format)
pub const RECEIVER_RECORDS_FORWARDED_TOTAL: &str = "httplog_receiver_records_forwarded_total";

/// 디코딩 실패 수 (counter, label: format)
pub const RECEIVER_DECODE_ERRORS_TOTAL: &str = "httplog_receiver_decode_errors_total";

/// 소비자 전달 실패 수 (counter)
pub const RECEIVER_FORWARD_ERRORS_TOTAL: &str = "httplog_receiver_forward_errors_total";

/// 요청 처리 지연 시간 (histogram, 초)
pub const RECEIVER_REQUEST_DURATION_SECONDS: &str = "httplog_receiver_request_duration_seconds";

/// 열려 있는 연결 수 (gauge)
pub const RECEIVER_OPEN_CONNECTIONS: &str = "httplog_receiver_open_connections";

/// 연결 수락 실패 수 (counter)
pub const RECEIVER_ACCEPT_ERRORS_TOTAL: &str = "httplog_receiver_accept_errors_total";

// ─── Daemon 메트릭 ────────────────────────────────────────────────

/// 빌드 정보 (gauge, label: version, 항상 1)
pub const DAEMON_BUILD_INFO: &str = "httplog_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 전역 레코더를 설치한 직후 한 번 호출합니다.
pub fn describe_all() {
    describe_counter!(
        RECEIVER_REQUESTS_TOTAL,
        "Total number of log ingestion requests handled"
    );
    describe_counter!(
        RECEIVER_RECORDS_FORWARDED_TOTAL,
        "Total number of log records handed to the downstream consumer"
    );
    describe_counter!(
        RECEIVER_DECODE_ERRORS_TOTAL,
        "Total number of request bodies that failed to decode"
    );
    describe_counter!(
        RECEIVER_FORWARD_ERRORS_TOTAL,
        "Total number of batches the downstream consumer failed to accept"
    );
    describe_histogram!(
        RECEIVER_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent decoding, normalizing and forwarding one request"
    );
    describe_gauge!(
        RECEIVER_OPEN_CONNECTIONS,
        "Number of currently open HTTP connections"
    );
    describe_counter!(
        RECEIVER_ACCEPT_ERRORS_TOTAL,
        "Total number of failed connection accepts"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information of the running daemon (always 1)"
    );
}
