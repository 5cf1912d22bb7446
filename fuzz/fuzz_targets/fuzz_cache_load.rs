#![no_main]

use libfuzzer_sys::fuzz_target;
use mimeinfo::Cache;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either decode or fail with a typed error,
    // never panic or read out of bounds
    let _ = Cache::from_bytes(data, "fuzz.cache");
});
