use std::fmt;

use super::{MIN_BSON_DOCUMENT_SIZE, RawIter, i32_from_slice};
use crate::error::{Error, Result};

/// A slice of a BSON document (akin to [`std::str`]). This can be created from any type that
/// contains BSON bytes, including static binary literals, [Vec<u8>](std::vec::Vec), or arrays.
///
/// This is an _unsized_ type, meaning that it must always be used behind a pointer like `&`.
///
/// Only the outer frame is checked on construction; the elements are validated by
/// [`RawDocument::iter`] as they are visited, so format errors can surface during iteration.
#[derive(PartialEq)]
#[repr(transparent)]
pub struct RawDocument {
    data: [u8],
}

impl RawDocument {
    /// Constructs a new [`RawDocument`], validating _only_ the
    /// following invariants:
    ///   * `data` is at least five bytes long (the minimum for a valid BSON document)
    ///   * the initial four bytes of `data` accurately represent the length of the bytes as
    ///     required by the BSON spec.
    ///   * the last byte of `data` is a 0
    pub fn from_bytes<D: AsRef<[u8]> + ?Sized>(data: &D) -> Result<&RawDocument> {
        let data = data.as_ref();

        if data.len() < MIN_BSON_DOCUMENT_SIZE as usize {
            return Err(Error::invalid_bson(format!(
                "document too short: {} bytes, expected at least {}",
                data.len(),
                MIN_BSON_DOCUMENT_SIZE
            )));
        }

        let length = i32_from_slice(data)?;

        if i64::from(length) != data.len() as i64 {
            return Err(Error::invalid_bson(format!(
                "document length {} does not match the {} bytes available",
                length,
                data.len()
            )));
        }

        if data[data.len() - 1] != 0 {
            return Err(Error::invalid_bson(format!(
                "document not null-terminated: expected 0x00 at offset {}",
                data.len() - 1
            )));
        }

        Ok(RawDocument::new_unchecked(data))
    }

    /// Creates a new `RawDocument` referencing the provided data slice.
    fn new_unchecked<D: AsRef<[u8]> + ?Sized>(data: &D) -> &RawDocument {
        // SAFETY:
        //
        // Dereferencing a raw pointer requires unsafe due to the potential that the pointer is
        // null, dangling, or misaligned. We know the pointer is not null or dangling due to the
        // fact that it's created by a safe reference. Converting &[u8] to *const [u8] will be
        // properly aligned due to them being references to the same type, and converting *const
        // [u8] to *const RawDocument is aligned due to the fact that the only field in a
        // RawDocument is a [u8] and it is #[repr(transparent), meaning the structs are represented
        // identically at the byte level.
        unsafe { &*(data.as_ref() as *const [u8] as *const RawDocument) }
    }

    /// Gets an iterator over the elements in the [`RawDocument`] that yields
    /// `Result<RawElement<'_>>`, validating each element as it goes.
    pub fn iter(&self) -> RawIter<'_> {
        RawIter::new(self)
    }

    /// Return the contained data as a `&[u8]`
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns whether this document contains no elements.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().len() == MIN_BSON_DOCUMENT_SIZE as usize
    }
}

impl fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDocument")
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl AsRef<RawDocument> for RawDocument {
    fn as_ref(&self) -> &RawDocument {
        self
    }
}

impl<'a> IntoIterator for &'a RawDocument {
    type IntoIter = RawIter<'a>;
    type Item = Result<super::RawElement<'a>>;

    fn into_iter(self) -> RawIter<'a> {
        self.iter()
    }
}
