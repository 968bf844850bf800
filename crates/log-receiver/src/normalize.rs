//! 타임스탬프 정규화
//!
//! 디코딩된 배치의 모든 레코드가 타임스탬프를 갖도록 보장합니다.
//! 디코더가 타임스탬프를 채우지 못한 레코드에는 수신 시각을 기록하고,
//! 이미 타임스탬프가 있는 레코드는 건드리지 않습니다.
//!
//! 배치 안의 모든 resource/scope를 순회하므로, 여러 scope로 구성된
//! 배치에서도 누락되는 레코드가 없습니다.

use httplog_core::types::{LogBatch, Timestamp};

/// 누락된 타임스탬프를 현재 시각으로 채웁니다.
///
/// 채운 레코드 수를 반환합니다.
pub fn normalize(batch: &mut LogBatch) -> usize {
    normalize_at(batch, Timestamp::now())
}

/// 누락된 타임스탬프를 `now`로 채웁니다.
///
/// 한 배치 안에서 채워지는 레코드는 모두 같은 시각을 받습니다.
pub fn normalize_at(batch: &mut LogBatch, now: Timestamp) -> usize {
    let mut filled = 0;
    for record in batch.records_mut() {
        if record.timestamp.is_none() {
            record.timestamp = Some(now);
            filled += 1;
        }
    }
    filled
}
