#![no_main]
use bsonjs::encode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|buf: &[u8]| {
    let _ = encode(buf);
});
