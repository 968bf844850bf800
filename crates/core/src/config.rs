//! 설정 관리 -- httplog.toml 파싱 및 런타임 설정
//!
//! [`HttplogConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HTTPLOG_RECEIVER_ENDPOINT=:9000` 형식)
//! 3. 설정 파일 (`httplog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), httplog_core::error::HttplogError> {
//! use httplog_core::config::HttplogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HttplogConfig::load("httplog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HttplogConfig::parse("[receiver]\nendpoint = \"127.0.0.1:9000\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HttplogError};

/// 수신기 기본 엔드포인트 (모든 인터페이스, 8888 포트)
pub const DEFAULT_ENDPOINT: &str = ":8888";

/// httplog 통합 설정
///
/// `httplog.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttplogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// HTTP 수신기 설정
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HttplogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HttplogError> {
        let mut config = Self::read_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드하고 검증합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HttplogError> {
        let config = Self::read_file(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일을 읽어 파싱만 합니다. 검증은 오버라이드를 모두 적용한 뒤
    /// 호출자가 수행해야 합니다.
    pub async fn read_file(path: impl AsRef<Path>) -> Result<Self, HttplogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HttplogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HttplogError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HttplogError> {
        toml::from_str(toml_str).map_err(|e| {
            HttplogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HTTPLOG_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "HTTPLOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HTTPLOG_GENERAL_LOG_FORMAT");

        override_string(&mut self.receiver.endpoint, "HTTPLOG_RECEIVER_ENDPOINT");

        override_bool(&mut self.metrics.enabled, "HTTPLOG_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "HTTPLOG_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "HTTPLOG_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HttplogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.receiver.validate()?;

        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(ConfigError::InvalidValue {
                field: "metrics.endpoint".to_owned(),
                reason: "only '/metrics' is supported".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// HTTP 수신기 설정
///
/// 서버 시작 전에 한 번 검증되고, 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// 수신 주소 (`host:port`, host 생략 시 모든 인터페이스)
    pub endpoint: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }
}

impl ReceiverConfig {
    /// 주어진 엔드포인트로 설정을 생성합니다.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// 엔드포인트 형식을 검증합니다.
    ///
    /// 포트는 필수이며 host는 생략할 수 있습니다. host 이름 해석은
    /// 바인드 시점에 수행됩니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            field: "receiver.endpoint".to_owned(),
            reason: reason.to_owned(),
        };

        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(invalid("endpoint must not be empty"));
        }

        let (host, port) = endpoint
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;

        port.parse::<u16>()
            .map_err(|_| invalid(&format!("invalid port '{port}'")))?;

        if host.contains(char::is_whitespace) {
            return Err(invalid("host must not contain whitespace"));
        }

        // IPv6 리터럴은 대괄호로 감싸야 포트와 구분됩니다.
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid("IPv6 hosts must be enclosed in brackets"));
        }

        Ok(())
    }

    /// 바인드에 사용할 주소를 반환합니다. `:port`는 `0.0.0.0:port`가 됩니다.
    pub fn bind_address(&self) -> String {
        let endpoint = self.endpoint.trim();
        if endpoint.starts_with(':') {
            format!("0.0.0.0{endpoint}")
        } else {
            endpoint.to_owned()
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스너 주소
    pub listen_addr: String,
    /// 리스너 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}
