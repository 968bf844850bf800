#![no_main]

use libfuzzer_sys::fuzz_target;
use httplog_core::pipeline::LogDecoder;
use httplog_receiver::decoder::JsonDecoder;

fuzz_target!(|data: &[u8]| {
    let decoder = JsonDecoder::default();
    let _ = decoder.decode(data);
});
