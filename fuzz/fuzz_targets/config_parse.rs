#![no_main]

use libfuzzer_sys::fuzz_target;
use httplog_core::config::HttplogConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(config) = HttplogConfig::parse(content) {
            let _ = config.validate();
            let _ = config.receiver.bind_address();
        }
    }
});
