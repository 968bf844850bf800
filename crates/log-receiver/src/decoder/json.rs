//! JSON 로그 디코더
//!
//! 평탄(flat) JSON 객체의 배열을 디코딩합니다. 객체 하나가 레코드 하나가 됩니다.
//!
//! # 형식
//! ```text
//! [
//!   { "timestamp": "2024-01-15T12:00:00.123456789Z", "level": "error", "msg": "boom" },
//!   { "level": "info", "msg": "no timestamp, stamped at arrival" }
//! ]
//! ```
//!
//! - `timestamp`가 있으면 RFC 3339 (나노초까지) 문자열이어야 합니다.
//!   없으면 정규화 단계에서 채워지고, 있는데 해석할 수 없으면 배치 전체가 실패합니다.
//! - 나머지 키는 모두 속성이 됩니다. `null`은 빈 값으로 남고, 중첩 배열/객체는 거부합니다.

use serde_json::{Map, Value};

use httplog_core::error::DecodeError;
use httplog_core::pipeline::LogDecoder;
use httplog_core::types::{AttributeValue, Attributes, LogBatch, LogRecord, TIMESTAMP_KEY, Timestamp};

use super::receiver_scope;

/// JSON 디코더
pub struct JsonDecoder {
    /// 최대 허용 입력 크기 (바이트)
    max_input_size: usize,
}

impl JsonDecoder {
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

    fn malformed(reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            format: "json".to_owned(),
            reason: reason.into(),
        }
    }

    /// JSON 객체 하나를 레코드로 변환합니다.
    fn decode_object(index: usize, mut object: Map<String, Value>) -> Result<LogRecord, DecodeError> {
        let timestamp = match object.remove(TIMESTAMP_KEY) {
            None => None,
            Some(Value::String(s)) => Some(Timestamp::parse_rfc3339(&s)?),
            Some(other) => {
                return Err(DecodeError::InvalidTimestamp {
                    value: other.to_string(),
                    reason: "expected an RFC 3339 string".to_owned(),
                });
            }
        };

        let mut attributes = Attributes::new();
        for (key, value) in object {
            let value = match value {
                Value::Null => AttributeValue::Empty,
                Value::String(s) => AttributeValue::Str(s),
                Value::Bool(b) => AttributeValue::Bool(b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => AttributeValue::Int(i),
                    None => AttributeValue::Double(n.as_f64().unwrap_or(f64::NAN)),
                },
                Value::Array(_) | Value::Object(_) => {
                    return Err(Self::malformed(format!(
                        "element {index}: attribute '{key}' is not a scalar value"
                    )));
                }
            };
            attributes.insert(key, value);
        }

        Ok(LogRecord {
            timestamp,
            attributes,
            body: None,
        })
    }
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDecoder for JsonDecoder {
    fn format_name(&self) -> &str {
        "json"
    }

    fn decode(&self, body: &[u8]) -> Result<LogBatch, DecodeError> {
        if body.len() > self.max_input_size {
            return Err(DecodeError::TooLarge {
                format: "json".to_owned(),
                size: body.len(),
                max: self.max_input_size,
            });
        }

        let objects: Vec<Map<String, Value>> = serde_json::from_slice(body).map_err(|e| {
            Self::malformed(format!("expected an array of flat objects: {e}"))
        })?;

        let records = objects
            .into_iter()
            .enumerate()
            .map(|(index, object)| Self::decode_object(index, object))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogBatch::single_scope(receiver_scope(), records))
    }
}
