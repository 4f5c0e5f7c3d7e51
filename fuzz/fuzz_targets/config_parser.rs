#![no_main]

use libfuzzer_sys::fuzz_target;
use machwatch::config::MonitorConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Arbitrary TOML must be rejected with an error, never a panic
        if let Ok(config) = MonitorConfig::from_toml_str(input) {
            assert!(config.validate().is_ok());
        }
    }
});
