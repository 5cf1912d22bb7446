#![no_main]

use libfuzzer_sys::fuzz_target;
use mimeinfo::glob_match;

fuzz_target!(|data: &[u8]| {
    // Split the input into a pattern and a name
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some((pattern, name)) = s.split_once('\n') {
            // Cap sizes: '*' matching backtracks and long adversarial
            // patterns are not interesting here
            if pattern.len() <= 64 && name.len() <= 256 {
                let _ = glob_match(pattern, name, true);
                let _ = glob_match(pattern, name, false);
            }
        }
    }
});
