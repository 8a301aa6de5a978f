//! Validation of raw BSON bytes.
//!
//! This module provides [`&RawDocument`](RawDocument), a borrowed view over the bytes of a
//! single BSON document, and [`RawIter`], which walks its elements and validates each one as it
//! is visited. Nothing is copied: every [`RawBsonRef`] yielded by the iterator borrows from the
//! original buffer.
//!
//! ```rust
//! use bsonjs::raw::{RawBsonRef, RawDocument};
//!
//! // See http://bsonspec.org/spec.html for details on the binary encoding of BSON.
//! let bytes = b"\x13\x00\x00\x00\x02hi\x00\x06\x00\x00\x00y'all\x00\x00";
//! let doc = RawDocument::from_bytes(bytes)?;
//!
//! let elem = doc.iter().next().unwrap()?;
//! assert_eq!(elem.key(), "hi");
//! assert_eq!(elem.value(), RawBsonRef::String("y'all"));
//! # Ok::<(), bsonjs::error::Error>(())
//! ```
//!
//! Errors name the offending byte offset. Offsets are relative to the start of the outermost
//! buffer when the iterator was created with [`RawIter::with_base_offset`], and relative to the
//! document otherwise.

mod bson_ref;
mod document;
mod iter;
#[cfg(test)]
pub(crate) mod props;

use crate::error::{Error, Result};

pub use self::{
    bson_ref::{
        RawBinaryRef,
        RawBsonRef,
        RawDbPointerRef,
        RawJavaScriptCodeWithScopeRef,
        RawRegexRef,
    },
    document::RawDocument,
    iter::{RawElement, RawIter},
};

pub(crate) const MIN_BSON_STRING_SIZE: i32 = 4 + 1; // 4 bytes for length, one byte for null terminator
pub(crate) const MIN_BSON_DOCUMENT_SIZE: i32 = 4 + 1; // 4 bytes for length, one byte for null terminator
pub(crate) const MIN_CODE_WITH_SCOPE_SIZE: i32 = 4 + MIN_BSON_STRING_SIZE + MIN_BSON_DOCUMENT_SIZE;

fn fixed<const N: usize>(val: &[u8], what: &str) -> Result<[u8; N]> {
    val.get(0..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            Error::invalid_bson(format!(
                "expected {N} bytes to read {what}, instead got {}",
                val.len()
            ))
        })
}

/// Given a u8 slice, return an f64 calculated from the first eight bytes in
/// little endian order.
fn f64_from_slice(val: &[u8]) -> Result<f64> {
    fixed::<8>(val, "double").map(f64::from_le_bytes)
}

/// Given a u8 slice, return an i32 calculated from the first four bytes in
/// little endian order.
pub(crate) fn i32_from_slice(val: &[u8]) -> Result<i32> {
    fixed::<4>(val, "i32").map(i32::from_le_bytes)
}

/// Given an u8 slice, return an i64 calculated from the first 8 bytes in
/// little endian order.
fn i64_from_slice(val: &[u8]) -> Result<i64> {
    fixed::<8>(val, "i64").map(i64::from_le_bytes)
}

fn bool_from_slice(val: &[u8]) -> Result<bool> {
    let [val] = fixed::<1>(val, "boolean")?;
    if val > 1 {
        return Err(Error::invalid_bson(format!(
            "boolean must be stored as 0 or 1, got {}",
            val
        )));
    }

    Ok(val != 0)
}

/// Returns the total size of the length-prefixed string at the start of `buf`: the 4 byte
/// length, the string bytes and the null terminator.
fn read_len(buf: &[u8]) -> Result<usize> {
    let length = i32_from_slice(buf)?;
    if length < 1 {
        return Err(Error::invalid_bson(format!(
            "BSON length encoded string needs to be at least {} bytes, instead got {}",
            MIN_BSON_STRING_SIZE,
            i64::from(length) + 4
        )));
    }

    let end = checked_add(length as usize, 4)?;
    if buf.len() < end {
        return Err(Error::invalid_bson(format!(
            "string length {} exceeds remaining {} bytes",
            length,
            buf.len() - 4
        )));
    }

    if buf[end - 1] != 0 {
        return Err(Error::invalid_bson("expected string to be null-terminated"));
    }

    Ok(end)
}

fn read_lenencode(buf: &[u8]) -> Result<&str> {
    let end = read_len(buf)?;

    // exclude length-prefix and null byte suffix
    try_to_str(&buf[4..(end - 1)])
}

/// Reads a null-terminated string from the start of `buf`, not including the terminator.
fn read_cstring(buf: &[u8]) -> Result<&str> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::invalid_bson("expected null-terminated key or cstring"))?;
    try_to_str(&buf[..end])
}

fn try_to_str(data: &[u8]) -> Result<&str> {
    simdutf8::compat::from_utf8(data)
        .map_err(|e| Error::invalid_bson(format!("invalid UTF-8: {e}")))
}

fn checked_add(lhs: usize, rhs: usize) -> Result<usize> {
    lhs.checked_add(rhs)
        .ok_or_else(|| Error::invalid_bson("attempted to add with overflow"))
}

#[cfg(test)]
mod test {
    use super::{bool_from_slice, read_cstring, read_lenencode};

    #[test]
    fn strings() {
        assert_eq!(read_lenencode(b"\x03\x00\x00\x00hi\x00rest").unwrap(), "hi");
        assert!(read_lenencode(b"\x00\x00\x00\x00").is_err());
        assert!(read_lenencode(b"\xff\xff\xff\xff").is_err());
        assert!(read_lenencode(b"\x05\x00\x00\x00hi\x00").is_err());
        assert!(read_lenencode(b"\x03\x00\x00\x00hix").is_err());
        assert!(read_lenencode(b"\x03\x00\x00\x00\xff\xfe\x00").is_err());
    }

    #[test]
    fn cstrings() {
        assert_eq!(read_cstring(b"key\x00value").unwrap(), "key");
        assert_eq!(read_cstring(b"\x00").unwrap(), "");
        assert!(read_cstring(b"key").is_err());
    }

    #[test]
    fn booleans() {
        assert!(!bool_from_slice(&[0]).unwrap());
        assert!(bool_from_slice(&[1]).unwrap());
        let err = bool_from_slice(&[2]).unwrap_err();
        assert!(err.to_string().contains("boolean must be stored as 0 or 1, got 2"));
        assert!(bool_from_slice(&[]).is_err());
    }
}
