#![no_main]
use bsonjs::{SerializationMode, decode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|buf: &[u8]| {
    for mode in [
        SerializationMode::Legacy,
        SerializationMode::Relaxed,
        SerializationMode::Canonical,
    ] {
        let _ = decode(buf, mode);
    }
});
