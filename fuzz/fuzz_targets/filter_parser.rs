#![no_main]

use libfuzzer_sys::fuzz_target;
use vigia::filter::SubsystemFilter;
use vigia::resolver::{classify, unit_stem};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither expression parsing nor request classification may panic
        let _ = SubsystemFilter::from_expr(input);
        let _ = classify(input);
        let _ = unit_stem(input);
    }
});
