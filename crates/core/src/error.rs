//! 에러 타입 -- 도메인별 에러 정의

/// httplog 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HttplogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 디코딩 에러
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// 다운스트림 소비자 에러
    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 디코딩 에러
///
/// 요청 본문이 선택된 형식의 문법을 따르지 않을 때 발생합니다.
/// 디코딩은 원자적이므로 이 에러가 발생하면 배치 전체가 버려집니다.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// 본문 구조가 형식에 맞지 않음
    #[error("{format}: {reason}")]
    Malformed { format: String, reason: String },

    /// 타임스탬프 값이 존재하지만 해석할 수 없음
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// 빈 본문
    #[error("{format}: empty body")]
    EmptyBody { format: String },

    /// 입력 데이터 초과
    #[error("{format}: input too large: {size} bytes (max: {max})")]
    TooLarge {
        format: String,
        size: usize,
        max: usize,
    },
}

/// 다운스트림 소비자 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsumerError {
    /// 소비자가 배치를 거부함 (재시도해도 같은 결과)
    #[error("batch rejected: {0}")]
    Rejected(String),

    /// 소비자가 일시적으로 처리 불가
    #[error("consumer unavailable: {0}")]
    Unavailable(String),
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 시작 실패
    #[error("pipeline start failed: {0}")]
    StartFailed(String),

    /// 정지 실패
    #[error("pipeline stop failed: {0}")]
    StopFailed(String),
}
