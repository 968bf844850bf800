//! 로그 디코딩 모듈 -- 와이어 형식별 디코더
//!
//! 지원 형식은 닫힌 열거형 [`LogFormat`]으로 표현됩니다. 형식 문자열은
//! [`LogFormat::from_query`] 한 곳에서만 해석되고, [`DecoderRegistry`]는
//! 형식별 디코더를 완전 매칭(exhaustive match)으로 선택합니다.
//! 새 형식을 추가하면 컴파일러가 누락된 분기를 알려줍니다.
//!
//! # 지원 형식
//! - `json`: 평탄 JSON 객체의 배열 ([`JsonDecoder`])
//! - `raw`: 본문 전체가 하나의 메시지 ([`RawDecoder`])
//!
//! # 사용 예시
//! ```ignore
//! use httplog_receiver::decoder::{DecoderRegistry, LogFormat};
//!
//! let registry = DecoderRegistry::new();
//! let format = LogFormat::from_query(Some("raw"))?;
//! let batch = registry.decode(format, b"disk almost full")?;
//! ```

pub mod json;
pub mod raw;

pub use json::JsonDecoder;
pub use raw::RawDecoder;

use std::fmt;

use httplog_core::error::DecodeError;
use httplog_core::pipeline::LogDecoder;
use httplog_core::types::{InstrumentationScope, LogBatch};

use crate::error::ReceiverError;

/// 디코더가 만드는 scope 이름
pub const SCOPE_NAME: &str = "httplog-receiver";

/// 디코더가 만드는 scope를 반환합니다.
pub(crate) fn receiver_scope() -> InstrumentationScope {
    InstrumentationScope::new(SCOPE_NAME, env!("CARGO_PKG_VERSION"))
}

/// 지원하는 와이어 형식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LogFormat {
    /// 평탄 JSON 객체 배열 (기본값)
    #[default]
    Json,
    /// 원시 바이트
    Raw,
}

impl LogFormat {
    /// 모든 형식
    pub const ALL: [LogFormat; 2] = [LogFormat::Json, LogFormat::Raw];

    /// 쿼리 파라미터 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Raw => "raw",
        }
    }

    /// `format` 쿼리 파라미터를 해석합니다.
    ///
    /// 없거나 빈 값이면 [`LogFormat::Json`]. 대소문자를 구분합니다.
    pub fn from_query(value: Option<&str>) -> Result<Self, ReceiverError> {
        match value {
            None | Some("") => Ok(Self::Json),
            Some("json") => Ok(Self::Json),
            Some("raw") => Ok(Self::Raw),
            Some(other) => Err(ReceiverError::UnsupportedFormat(other.to_owned())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 형식별 디코더 레지스트리
///
/// 시작 후에는 읽기 전용이므로 잠금 없이 요청 태스크 간에 공유됩니다.
pub struct DecoderRegistry {
    json: JsonDecoder,
    raw: RawDecoder,
}

impl DecoderRegistry {
    /// 기본 디코더로 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            json: JsonDecoder::default(),
            raw: RawDecoder::default(),
        }
    }

    /// JSON 디코더를 교체합니다.
    pub fn with_json(mut self, decoder: JsonDecoder) -> Self {
        self.json = decoder;
        self
    }

    /// raw 디코더를 교체합니다.
    pub fn with_raw(mut self, decoder: RawDecoder) -> Self {
        self.raw = decoder;
        self
    }

    /// 형식에 해당하는 디코더를 반환합니다.
    pub fn decoder_for(&self, format: LogFormat) -> &dyn LogDecoder {
        match format {
            LogFormat::Json => &self.json,
            LogFormat::Raw => &self.raw,
        }
    }

    /// 선택된 형식으로 본문을 디코딩합니다.
    pub fn decode(&self, format: LogFormat, body: &[u8]) -> Result<LogBatch, DecodeError> {
        self.decoder_for(format).decode(body)
    }

    /// 등록된 형식 이름 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<&str> {
        LogFormat::ALL
            .iter()
            .map(|f| self.decoder_for(*f).format_name())
            .collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_format_defaults_to_json() {
        assert_eq!(LogFormat::from_query(None).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_query(Some("")).unwrap(), LogFormat::Json);
    }

    #[test]
    fn known_formats_parse() {
        assert_eq!(LogFormat::from_query(Some("json")).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_query(Some("raw")).unwrap(), LogFormat::Raw);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = LogFormat::from_query(Some("xyz")).unwrap_err();
        assert!(matches!(err, ReceiverError::UnsupportedFormat(ref f) if f == "xyz"));
    }

    #[test]
    fn format_matching_is_case_sensitive() {
        assert!(LogFormat::from_query(Some("JSON")).is_err());
    }

    #[test]
    fn registry_names_match_format_names() {
        let registry = DecoderRegistry::new();
        for format in LogFormat::ALL {
            assert_eq!(registry.decoder_for(format).format_name(), format.as_str());
        }
        assert_eq!(registry.registered_formats(), vec!["json", "raw"]);
    }

    #[test]
    fn registry_dispatches_by_format() {
        let registry = DecoderRegistry::new();
        let batch = registry.decode(LogFormat::Raw, b"[1,2,3]").unwrap();
        assert_eq!(batch.record_count(), 1);

        assert!(registry.decode(LogFormat::Json, b"[1,2,3]").is_err());
    }
}
