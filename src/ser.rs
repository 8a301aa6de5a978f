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

//! Writer for the BSON binary format.

use crate::{
    bson::{Array, Bson, Document},
    error::{Error, Result, try_with_key},
    raw::MIN_BSON_DOCUMENT_SIZE,
    spec::{BinarySubtype, ElementType},
};

/// The largest document the BSON length prefix can describe.
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = i32::MAX as usize;

/// Writes [`Document`]s into their BSON binary form.
///
/// ```rust
/// use bsonjs::{doc, ser::BsonWriter};
///
/// let bytes = BsonWriter::new().write(&doc! { "a": 1 })?;
/// assert_eq!(bytes, b"\x0c\x00\x00\x00\x10a\x00\x01\x00\x00\x00\x00");
/// # Ok::<(), bsonjs::error::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BsonWriter {
    max_size: usize,
}

impl Default for BsonWriter {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

impl BsonWriter {
    /// Creates a writer that accepts any document the length prefix can describe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer that rejects any document, embedded document or code with scope value
    /// whose encoded length exceeds `max_size` bytes.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size: max_size.min(DEFAULT_MAX_DOCUMENT_SIZE),
        }
    }

    /// Encodes `doc` into a freshly allocated buffer.
    pub fn write(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.append_document(&mut buf, doc)?;
        Ok(buf)
    }

    fn append_document(&self, buf: &mut Vec<u8>, doc: &Document) -> Result<()> {
        let mut writer = DocWriter::open(buf);
        for (key, value) in doc {
            try_with_key(key, || self.append_element(&mut writer, key, value))?;
        }
        writer.close(self.max_size)
    }

    fn append_array(&self, buf: &mut Vec<u8>, array: &Array) -> Result<()> {
        let mut writer = DocWriter::open(buf);
        for (index, value) in array.iter().enumerate() {
            let key = index.to_string();
            try_with_key(&key, || self.append_element(&mut writer, &key, value))?;
        }
        writer.close(self.max_size)
    }

    fn append_element(&self, writer: &mut DocWriter, key: &str, value: &Bson) -> Result<()> {
        writer.append_key(value.element_type(), key)?;
        let buf = writer.buffer();

        match value {
            Bson::Double(v) => buf.extend(v.to_le_bytes()),
            Bson::String(s) | Bson::JavaScriptCode(s) | Bson::Symbol(s) => write_string(buf, s)?,
            Bson::Document(doc) => self.append_document(buf, doc)?,
            Bson::Array(array) => self.append_array(buf, array)?,
            Bson::Binary(binary) => {
                let inner_len = len_i32(binary.bytes.len())?;
                if binary.subtype == BinarySubtype::BinaryOld {
                    buf.extend(len_i32(binary.bytes.len() + 4)?.to_le_bytes());
                    buf.push(binary.subtype.into());
                    buf.extend(inner_len.to_le_bytes());
                } else {
                    buf.extend(inner_len.to_le_bytes());
                    buf.push(binary.subtype.into());
                }
                buf.extend(&binary.bytes);
            }
            Bson::ObjectId(oid) => buf.extend(oid.bytes()),
            Bson::Boolean(b) => buf.push(*b as u8),
            Bson::DateTime(dt) => buf.extend(dt.timestamp_millis().to_le_bytes()),
            Bson::RegularExpression(regex) => {
                write_cstring(buf, &regex.pattern)?;
                write_cstring(buf, &regex.options)?;
            }
            Bson::JavaScriptCodeWithScope(code_w_scope) => {
                let start = buf.len();
                buf.extend(0i32.to_le_bytes());
                write_string(buf, &code_w_scope.code)?;
                self.append_document(buf, &code_w_scope.scope)?;
                patch_length(buf, start, self.max_size)?;
            }
            Bson::Int32(v) => buf.extend(v.to_le_bytes()),
            Bson::Int64(v) => buf.extend(v.to_le_bytes()),
            Bson::Timestamp(ts) => buf.extend(ts.to_le_bytes()),
            Bson::Decimal128(d) => buf.extend(d.bytes()),
            Bson::DbPointer(pointer) => {
                write_string(buf, &pointer.namespace)?;
                buf.extend(pointer.id.bytes());
            }
            Bson::Null | Bson::Undefined | Bson::MinKey | Bson::MaxKey => {}
        }

        Ok(())
    }
}

/// Encodes `doc` with the default [`BsonWriter`].
pub fn write_document(doc: &Document) -> Result<Vec<u8>> {
    BsonWriter::new().write(doc)
}

/// Writes the elements of one document, then back-patches its length on [`DocWriter::close`].
struct DocWriter<'a> {
    data: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> DocWriter<'a> {
    fn open(data: &'a mut Vec<u8>) -> Self {
        let start = data.len();
        data.extend(MIN_BSON_DOCUMENT_SIZE.to_le_bytes());
        Self { data, start }
    }

    fn append_key(&mut self, element_type: ElementType, key: &str) -> Result<()> {
        self.data.push(element_type as u8);
        write_cstring(self.data, key)
    }

    fn buffer(&mut self) -> &mut Vec<u8> {
        self.data
    }

    fn close(self, max_size: usize) -> Result<()> {
        self.data.push(0);
        patch_length(self.data, self.start, max_size)
    }
}

/// Overwrites the four bytes at `start` with the length of everything written since.
fn patch_length(buf: &mut [u8], start: usize, max_size: usize) -> Result<()> {
    let length = buf.len() - start;
    if length > max_size {
        return Err(Error::too_large(length, max_size));
    }
    let length = len_i32(length)?;
    buf[start..start + 4].copy_from_slice(&length.to_le_bytes());
    Ok(())
}

fn len_i32(length: usize) -> Result<i32> {
    i32::try_from(length).map_err(|_| Error::too_large(length, DEFAULT_MAX_DOCUMENT_SIZE))
}

fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    buf.extend(len_i32(s.len() + 1)?.to_le_bytes());
    buf.extend(s.as_bytes());
    buf.push(0);
    Ok(())
}

fn write_cstring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.contains('\0') {
        return Err(Error::invalid_bson(format!(
            "cstring with interior null: {:?}",
            s
        )));
    }
    buf.extend(s.as_bytes());
    buf.push(0);
    Ok(())
}
