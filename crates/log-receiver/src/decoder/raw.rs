//! raw 로그 디코더
//!
//! 요청 본문 전체를 해석하지 않고 하나의 레코드 본문으로 사용합니다.

use bytes::Bytes;

use httplog_core::error::DecodeError;
use httplog_core::pipeline::LogDecoder;
use httplog_core::types::{LogBatch, LogRecord};

use super::receiver_scope;

/// raw 디코더
///
/// 레코드 하나를 만들고 본문에 입력 바이트를 그대로 담습니다.
/// 타임스탬프는 정규화 단계에서 채워집니다.
pub struct RawDecoder {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl RawDecoder {
    /// 새 디코더를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_input_size: 4 * 1024 * 1024, // 4MB
        }
    }

    /// 최대 입력 크기를 설정합니다.
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }
}

impl Default for RawDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDecoder for RawDecoder {
    fn format_name(&self) -> &str {
        "raw"
    }

    fn decode(&self, body: &[u8]) -> Result<LogBatch, DecodeError> {
        if body.is_empty() {
            return Err(DecodeError::EmptyBody {
                format: "raw".to_owned(),
            });
        }

        if body.len() > self.max_input_size {
            return Err(DecodeError::TooLarge {
                format: "raw".to_owned(),
                size: body.len(),
                max: self.max_input_size,
            });
        }

        let record = LogRecord::new().with_body(Bytes::copy_from_slice(body));
        Ok(LogBatch::single_scope(receiver_scope(), vec![record]))
    }
}
