//! Arbitrary bytes into the decoder: must never panic, only error.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = finset::decode(data);
});
