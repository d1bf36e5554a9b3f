//! Arbitrary bytes behind a valid magic: exercises the optional
//! document components.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut bytes = vec![0xE0, 0x00, 0x00, 0x01];
    bytes.extend_from_slice(data);
    let _ = finset::decode(&bytes);
});
