#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use httplog_receiver::decoder::{DecoderRegistry, LogFormat};
use httplog_receiver::normalize::normalize;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// `format` 쿼리 값 (없음 포함)
    format: Option<String>,
    /// 요청 본문
    body: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(format) = LogFormat::from_query(input.format.as_deref()) else {
        return;
    };

    let registry = DecoderRegistry::new();
    if let Ok(mut batch) = registry.decode(format, &input.body) {
        let count = batch.record_count();
        normalize(&mut batch);
        assert_eq!(batch.record_count(), count);
        assert!(batch.records().all(|r| r.timestamp.is_some()));
    }
});
