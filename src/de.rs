// The MIT License (MIT)

// Copyright (c) 2015 Y. T. Chung <zonyitoo@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Reader for the BSON binary format.

use crate::{
    JavaScriptCodeWithScope,
    bson::{Bson, Document},
    error::{Error, Result, try_with_key},
    raw::{MIN_BSON_DOCUMENT_SIZE, RawBsonRef, RawDocument, RawElement, RawIter, i32_from_slice},
};

/// Documents and arrays nested deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Reads a single BSON document out of a byte buffer into an owned [`Document`].
///
/// ```rust
/// use bsonjs::{Bson, de::BsonReader};
///
/// let bytes = b"\x0c\x00\x00\x00\x10a\x00\x01\x00\x00\x00\x00";
/// let doc = BsonReader::new().read(bytes)?;
/// assert_eq!(doc.get("a"), Some(&Bson::Int32(1)));
/// # Ok::<(), bsonjs::error::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BsonReader {
    allow_trailing_bytes: bool,
}

impl Default for BsonReader {
    fn default() -> Self {
        Self {
            allow_trailing_bytes: true,
        }
    }
}

impl BsonReader {
    /// Creates a reader that ignores any bytes after the first document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether bytes following the document's declared length are ignored (the default) or
    /// rejected.
    pub fn allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }

    /// Validates and reads the document at the start of `buffer`.
    pub fn read(&self, buffer: &[u8]) -> Result<Document> {
        let length = self.declared_length(buffer)?;
        let doc = RawDocument::from_bytes(&buffer[..length])?;
        read_elements(doc.iter(), 0)
    }

    fn declared_length(&self, buffer: &[u8]) -> Result<usize> {
        if buffer.len() < 4 {
            return Err(Error::invalid_bson(format!(
                "buffer of {} bytes is too short to hold a document length",
                buffer.len()
            )));
        }

        let length = i32_from_slice(buffer)?;
        if length < MIN_BSON_DOCUMENT_SIZE {
            return Err(Error::invalid_bson(format!(
                "document length {} is less than the minimum of {}",
                length, MIN_BSON_DOCUMENT_SIZE
            )));
        }

        let length = length as usize;
        if length > buffer.len() {
            return Err(Error::invalid_bson(format!(
                "document length {} exceeds buffer length {}",
                length,
                buffer.len()
            )));
        }

        if !self.allow_trailing_bytes && length < buffer.len() {
            return Err(Error::invalid_bson(format!(
                "{} trailing bytes after document of length {}",
                buffer.len() - length,
                length
            )));
        }

        Ok(length)
    }
}

/// Reads the document at the start of `buffer` with the default [`BsonReader`].
pub fn read_document(buffer: &[u8]) -> Result<Document> {
    BsonReader::new().read(buffer)
}

fn read_elements(iter: RawIter<'_>, depth: usize) -> Result<Document> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::invalid_bson(format!(
            "documents nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }

    let mut doc = Document::new();
    for element in iter {
        let element = element?;
        let value = try_with_key(element.key(), || read_value(&element, depth))?;
        doc.push(element.key(), value);
    }
    Ok(doc)
}

fn read_value(element: &RawElement<'_>, depth: usize) -> Result<Bson> {
    let offset = element.value_offset();
    match element.value() {
        RawBsonRef::Document(doc) => {
            let iter = doc.iter().with_base_offset(offset);
            Ok(Bson::Document(read_elements(iter, depth + 1)?))
        }
        // keys are ignored; only the order of the values matters
        RawBsonRef::Array(doc) => {
            let iter = doc.iter().with_base_offset(offset);
            let values = read_elements(iter, depth + 1)?
                .into_iter()
                .map(|(_, v)| v)
                .collect();
            Ok(Bson::Array(values))
        }
        RawBsonRef::JavaScriptCodeWithScope(code_w_scope) => {
            let iter = code_w_scope
                .scope
                .iter()
                .with_base_offset(offset + code_w_scope.scope_offset());
            Ok(Bson::JavaScriptCodeWithScope(JavaScriptCodeWithScope {
                code: code_w_scope.code.to_string(),
                scope: read_elements(iter, depth + 1)?,
            }))
        }
        other => other.to_scalar_bson().ok_or_else(|| {
            Error::invalid_bson(format!(
                "unexpected {:?} value at offset {}",
                other.element_type(),
                offset
            ))
        }),
    }
}
