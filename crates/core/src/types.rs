//! 도메인 타입 -- 수신된 로그를 표현하는 정규 모델
//!
//! 디코더가 생성하고, 정규화 단계가 보완하고, 다운스트림 소비자가 받는
//! 데이터 구조를 정의합니다.
//!
//! # 구조
//! ```text
//! LogBatch
//!  └─ ResourceLogs (resource)
//!      └─ ScopeLogs (scope)
//!          └─ LogRecord (timestamp, attributes, body)
//! ```
//! 디코더는 항상 하나의 resource와 하나의 scope를 만들지만, 배치를 다루는 코드는
//! [`LogBatch::records`]로 중첩 구조와 무관하게 모든 레코드를 순회해야 합니다.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// JSON 와이어 형식에서 타임스탬프를 담는 예약 키
pub const TIMESTAMP_KEY: &str = "timestamp";

/// 로그 레코드 타임스탬프
///
/// Unix epoch 이후 나노초. 0은 "설정되지 않음"과 구분할 수 없으므로
/// 표현 자체가 0을 허용하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NonZeroU64);

impl Timestamp {
    /// Unix epoch 이후 나노초에서 생성합니다. 0이면 `None`.
    pub fn from_unix_nanos(nanos: u64) -> Option<Self> {
        NonZeroU64::new(nanos).map(Self)
    }

    /// 현재 벽시계 시각
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(1);
        Self(NonZeroU64::new(nanos).unwrap_or(NonZeroU64::MIN))
    }

    /// RFC 3339 문자열을 파싱합니다.
    ///
    /// 날짜와 시각은 반드시 `T`로 구분하고, 소수 초는 1~9자리만 허용합니다
    /// (`YYYY-MM-DDTHH:MM:SS[.fffffffff](Z|±HH:MM)`). 소수 초는 나노초 정밀도까지
    /// 보존됩니다. Unix epoch 이전이거나 같은 시각은 유효한 타임스탬프로 표현할 수
    /// 없으므로 거부합니다.
    pub fn parse_rfc3339(value: &str) -> Result<Self, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidTimestamp {
            value: value.to_owned(),
            reason,
        };

        check_profile(value).map_err(|reason| invalid(reason.to_owned()))?;

        let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| invalid(e.to_string()))?;
        let nanos = parsed
            .timestamp_nanos_opt()
            .ok_or_else(|| invalid("out of representable range".to_owned()))?;

        u64::try_from(nanos)
            .ok()
            .and_then(Self::from_unix_nanos)
            .ok_or_else(|| invalid("must be after the Unix epoch".to_owned()))
    }

    /// Unix epoch 이후 나노초
    pub fn as_unix_nanos(&self) -> u64 {
        self.0.get()
    }

    /// UTC 시각으로 변환합니다.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(i64::try_from(self.0.get()).unwrap_or(i64::MAX))
    }
}

/// chrono의 RFC 3339 파서가 허용하는 변형(공백 구분자, 10자리 이상의 소수 초)을 걸러냅니다.
fn check_profile(value: &str) -> Result<(), &'static str> {
    let bytes = value.as_bytes();
    if bytes.get(10) != Some(&b'T') {
        return Err("date and time must be separated by 'T'");
    }
    if bytes.get(19) == Some(&b'.') {
        let digits = bytes[20..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || digits > 9 {
            return Err("fractional seconds must have 1 to 9 digits");
        }
    }
    Ok(())
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

/// 속성 값 (스칼라)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// 문자열
    Str(String),
    /// 불리언
    Bool(bool),
    /// 정수
    Int(i64),
    /// 실수
    Double(f64),
    /// 값 없음 (JSON `null`)
    Empty,
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// 레코드 속성 맵. 키는 유일하며 순서는 의미가 없습니다.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// 로그 레코드
///
/// 관측된 로그 이벤트 하나를 나타냅니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    /// 타임스탬프. 디코딩 직후에는 없을 수 있지만 정규화 이후에는 항상 존재합니다.
    pub timestamp: Option<Timestamp>,
    /// 속성 (예약 키 `timestamp`는 포함하지 않음)
    pub attributes: Attributes,
    /// 원본 메시지 (raw 형식 레코드)
    pub body: Option<Bytes>,
}

impl LogRecord {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 본문을 설정합니다.
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// 타임스탬프를 설정합니다.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// 속성을 추가합니다.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 속성 값을 조회합니다.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// 본문을 UTF-8 문자열로 반환합니다 (유효하지 않은 바이트는 대체 문자로).
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }
}

/// 배치가 속한 resource (현재는 그룹핑용 자리표시자)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// resource 속성
    pub attributes: Attributes,
}

/// 레코드를 생성한 계측 범위
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationScope {
    /// 범위 이름
    pub name: String,
    /// 범위 버전
    pub version: String,
}

impl InstrumentationScope {
    /// 새 범위를 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// 하나의 scope에 속한 레코드 묶음
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeLogs {
    /// 계측 범위
    pub scope: InstrumentationScope,
    /// 레코드 목록 (순서 유지)
    pub records: Vec<LogRecord>,
}

/// 하나의 resource에 속한 scope 묶음
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLogs {
    /// resource
    pub resource: Resource,
    /// scope 목록
    pub scopes: Vec<ScopeLogs>,
}

/// 로그 배치
///
/// HTTP 요청 본문 하나를 디코딩한 결과입니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    /// resource 목록
    pub resources: Vec<ResourceLogs>,
}

impl LogBatch {
    /// 빈 배치를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 하나의 resource, 하나의 scope로 구성된 배치를 생성합니다.
    pub fn single_scope(scope: InstrumentationScope, records: Vec<LogRecord>) -> Self {
        Self {
            resources: vec![ResourceLogs {
                resource: Resource::default(),
                scopes: vec![ScopeLogs { scope, records }],
            }],
        }
    }

    /// 중첩 구조와 무관하게 모든 레코드를 순회합니다.
    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.resources
            .iter()
            .flat_map(|r| r.scopes.iter())
            .flat_map(|s| s.records.iter())
    }

    /// 모든 레코드를 가변 참조로 순회합니다.
    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut LogRecord> {
        self.resources
            .iter_mut()
            .flat_map(|r| r.scopes.iter_mut())
            .flat_map(|s| s.records.iter_mut())
    }

    /// 전체 레코드 수
    pub fn record_count(&self) -> usize {
        self.resources
            .iter()
            .flat_map(|r| r.scopes.iter())
            .map(|s| s.records.len())
            .sum()
    }

    /// 레코드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}
