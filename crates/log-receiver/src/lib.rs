#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`decoder`]: 와이어 형식별 디코더 (JSON, raw)와 형식 선택
//! - [`normalize`]: 누락된 타임스탬프를 수신 시각으로 채우는 정규화
//! - [`forwarder`]: 정규화된 배치를 다운스트림 소비자에게 전달
//! - [`dispatcher`]: `POST /logs` 라우터와 요청 핸들러
//! - [`server`]: 리스너, 연결 수락 루프, graceful shutdown (Pipeline trait 구현)
//! - [`error`]: 도메인 에러 타입과 HTTP 상태 코드 매핑
//!
//! # 아키텍처
//!
//! ```text
//! TCP accept -> hyper HTTP/1 -> Router(POST /logs)
//!                                   |
//!          LogFormat -> Decoder -> normalize -> Forwarder -> LogConsumer
//! ```

pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod normalize;
pub mod server;

// --- 주요 타입 re-export ---

// 서버
pub use server::{LogReceiver, LogReceiverBuilder, ServerState};

// 디스패처
pub use dispatcher::{ReceiverState, router};

// 디코더
pub use decoder::{DecoderRegistry, JsonDecoder, LogFormat, RawDecoder};

// 전달
pub use forwarder::Forwarder;

// 정규화
pub use normalize::{normalize, normalize_at};

// 에러
pub use error::ReceiverError;
