#![no_main]
use bsonjs::{de::read_document, ser::write_document};
use libfuzzer_sys::fuzz_target;

// Writing normalizes array keys and old binary lengths, so compare the second write to the first.
fuzz_target!(|buf: &[u8]| {
    let Ok(doc) = read_document(buf) else {
        return;
    };
    let Ok(bytes) = write_document(&doc) else {
        return;
    };
    let again = read_document(&bytes).and_then(|doc| write_document(&doc));
    assert_eq!(again.ok().as_deref(), Some(bytes.as_slice()));
});
