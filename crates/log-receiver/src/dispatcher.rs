//! 요청 디스패처 -- `POST /logs` 핸들러
//!
//! 요청 하나를 다음 순서로 처리합니다.
//!
//! ```text
//! format 쿼리 -> 디코더 선택 -> 본문 읽기 -> 디코딩 -> 정규화 -> 전달
//! ```
//!
//! 형식이 잘못되면 본문을 읽지 않고 즉시 400으로 응답합니다.
//! 본문 읽기부터 전달까지는 [`REQUEST_TIMEOUT`] 안에 끝나야 합니다.
//! 요청 간에 공유되는 가변 상태는 없습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Deserialize;
use tracing::{debug, warn};

use httplog_core::metrics as m;

use crate::decoder::{DecoderRegistry, LogFormat};
use crate::error::ReceiverError;
use crate::forwarder::Forwarder;
use crate::normalize::normalize;

/// 수집 엔드포인트 경로
pub const LOGS_PATH: &str = "/logs";

/// 요청당 처리 시간 제한 (본문 읽기, 디코딩, 정규화, 전달)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 최대 요청 본문 크기 (4 MiB)
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// 성공 응답 본문
pub const SUCCESS_MESSAGE: &str = "Successfully processed logs\n";

/// 핸들러가 공유하는 읽기 전용 상태
#[derive(Clone)]
pub struct ReceiverState {
    decoders: Arc<DecoderRegistry>,
    forwarder: Forwarder,
}

impl ReceiverState {
    /// 새 상태를 생성합니다.
    pub fn new(decoders: Arc<DecoderRegistry>, forwarder: Forwarder) -> Self {
        Self {
            decoders,
            forwarder,
        }
    }

    /// 본문을 읽고 디코딩, 정규화한 뒤 전달합니다.
    ///
    /// 전달한 레코드 수를 반환합니다.
    async fn process(&self, format: LogFormat, body: Body) -> Result<usize, ReceiverError> {
        let body = read_body(body).await?;

        let mut batch = self
            .decoders
            .decode(format, &body)
            .map_err(|source| ReceiverError::Decode {
                format: format.as_str(),
                source,
            })?;

        let stamped = normalize(&mut batch);
        debug!(
            format = %format,
            records = batch.record_count(),
            stamped,
            "decoded log batch"
        );

        self.forwarder.forward(batch).await
    }
}

/// `format` 쿼리 파라미터
#[derive(Debug, Default, Deserialize)]
pub struct IngestQuery {
    /// 와이어 형식 (없으면 json)
    pub format: Option<String>,
}

/// 수집 라우터를 생성합니다.
///
/// `/logs`에 대한 다른 메서드는 405, 다른 경로는 404로 응답합니다.
pub fn router(state: ReceiverState) -> Router {
    Router::new()
        .route(LOGS_PATH, post(ingest_logs))
        .with_state(state)
}

async fn ingest_logs(
    State(state): State<ReceiverState>,
    Query(query): Query<IngestQuery>,
    body: Body,
) -> Response {
    let started = Instant::now();

    let format = match LogFormat::from_query(query.format.as_deref()) {
        Ok(format) => format,
        Err(err) => {
            warn!(error = %err, "rejected log request");
            record_request("unknown", err.result_label());
            return err.into_response();
        }
    };

    let result = match tokio::time::timeout(REQUEST_TIMEOUT, state.process(format, body)).await {
        Ok(result) => result,
        Err(_) => Err(ReceiverError::Timeout(REQUEST_TIMEOUT)),
    };

    metrics::histogram!(m::RECEIVER_REQUEST_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(records) => {
            record_request(format.as_str(), "success");
            metrics::counter!(m::RECEIVER_RECORDS_FORWARDED_TOTAL, m::LABEL_FORMAT => format.as_str())
                .increment(records as u64);
            (StatusCode::OK, SUCCESS_MESSAGE).into_response()
        }
        Err(err) => {
            if matches!(err, ReceiverError::Decode { .. }) {
                metrics::counter!(m::RECEIVER_DECODE_ERRORS_TOTAL, m::LABEL_FORMAT => format.as_str())
                    .increment(1);
            }
            warn!(format = %format, error = %err, "failed to process log request");
            record_request(format.as_str(), err.result_label());
            err.into_response()
        }
    }
}

fn record_request(format: &'static str, result: &'static str) {
    metrics::counter!(
        m::RECEIVER_REQUESTS_TOTAL,
        m::LABEL_FORMAT => format,
        m::LABEL_RESULT => result
    )
    .increment(1);
}

/// 크기 제한을 지키며 본문 전체를 읽습니다.
async fn read_body(body: Body) -> Result<Bytes, ReceiverError> {
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ReceiverError::PayloadTooLarge {
                limit: MAX_BODY_BYTES,
            })
        }
        Err(err) => Err(ReceiverError::BodyRead(err.to_string())),
    }
}
