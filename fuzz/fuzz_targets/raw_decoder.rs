#![no_main]

use libfuzzer_sys::fuzz_target;
use httplog_core::pipeline::LogDecoder;
use httplog_receiver::decoder::RawDecoder;

fuzz_target!(|data: &[u8]| {
    let decoder = RawDecoder::default();
    if let Ok(batch) = decoder.decode(data) {
        assert_eq!(batch.record_count(), 1);
        let record = batch.records().next().unwrap();
        assert_eq!(record.body.as_deref(), Some(data));
    }
});
