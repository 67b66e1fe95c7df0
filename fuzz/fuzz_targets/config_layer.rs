#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;
use vigia::config::{Config, ConfigLayer};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(layer) = ConfigLayer::from_toml_str(input) {
            // Merging must either validate or fail cleanly
            let _ = Config::from_layers(Path::new("/work"), [layer]);
        }
    }
});
