//! 파이프라인 trait -- 모듈 확장 포인트 정의

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{ConsumerError, DecodeError, HttplogError};
use crate::types::LogBatch;

/// `dyn` 호환 trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 로그 디코더 trait
///
/// 새로운 와이어 형식을 지원하려면 이 trait을 구현하고
/// 수신기의 형식 목록에 변형을 추가합니다.
pub trait LogDecoder: Send + Sync {
    /// 지원하는 형식 이름 (쿼리 파라미터 값과 동일)
    fn format_name(&self) -> &str;

    /// 요청 본문 전체를 하나의 배치로 디코딩합니다.
    ///
    /// 실패 시 부분 결과를 반환하지 않습니다.
    fn decode(&self, body: &[u8]) -> Result<LogBatch, DecodeError>;
}

/// 다운스트림 로그 소비자
///
/// 정규화된 배치를 받아 이후 처리(내보내기 등)를 담당합니다.
/// 수신기는 모든 요청 태스크에서 같은 핸들을 공유하므로,
/// 구현체는 동시 호출을 안전하게 처리해야 합니다.
pub trait LogConsumer: Send + Sync {
    /// 소비자 이름 (진단 로그용)
    fn name(&self) -> &str;

    /// 배치를 소비합니다.
    fn consume(&self, batch: LogBatch) -> BoxFuture<'_, Result<(), ConsumerError>>;
}

/// 모듈 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지 생명주기를 가진 모듈
///
/// daemon은 이 trait으로 모듈을 시작하고 종료 시그널에 맞춰 정지합니다.
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 백그라운드 작업을 스폰한 뒤 즉시 반환해야 합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), HttplogError>> + Send;

    /// 모듈을 정지합니다. 이미 정지된 모듈에 대해서는 아무 것도 하지 않습니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), HttplogError>> + Send;

    /// 현재 헬스 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}
