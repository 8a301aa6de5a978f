use crate::{
    DateTime,
    Decimal128,
    Timestamp,
    error::{Error, ErrorKind, Result, try_with_key},
    oid::ObjectId,
    spec::{BinarySubtype, ElementType},
};

use super::{
    MIN_BSON_DOCUMENT_SIZE,
    MIN_CODE_WITH_SCOPE_SIZE,
    RawBinaryRef,
    RawBsonRef,
    RawDbPointerRef,
    RawDocument,
    RawJavaScriptCodeWithScopeRef,
    RawRegexRef,
    bool_from_slice,
    checked_add,
    f64_from_slice,
    i32_from_slice,
    i64_from_slice,
    read_cstring,
    read_len,
    read_lenencode,
};

/// A validated element of a [`RawDocument`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawElement<'a> {
    key: &'a str,
    value: RawBsonRef<'a>,
    value_offset: usize,
}

impl<'a> RawElement<'a> {
    /// The element's key.
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// The element's value.
    pub fn value(&self) -> RawBsonRef<'a> {
        self.value
    }

    /// The offset of the element's value, relative to the iterator's base offset.
    pub fn value_offset(&self) -> usize {
        self.value_offset
    }
}

/// An iterator over the document's entries.
pub struct RawIter<'a> {
    doc: &'a RawDocument,
    offset: usize,
    base_offset: usize,

    /// Whether the underlying doc is assumed to be valid or if an error has been encountered.
    /// After an error, all subsequent iterations will return None.
    valid: bool,
}

impl<'a> RawIter<'a> {
    pub(crate) fn new(doc: &'a RawDocument) -> Self {
        Self {
            doc,
            offset: 4,
            base_offset: 0,
            valid: true,
        }
    }

    /// Reports offsets (in errors and in [`RawElement::value_offset`]) as if the document started
    /// `base_offset` bytes into an enclosing buffer.
    pub fn with_base_offset(mut self, base_offset: usize) -> Self {
        self.base_offset = base_offset;
        self
    }

    fn bytes(&self) -> &'a [u8] {
        self.doc.as_bytes()
    }

    /// Position of the document terminator. Element data must end at or before it.
    fn terminator(&self) -> usize {
        self.bytes().len() - 1
    }

    fn absolute(&self, offset: usize) -> usize {
        self.base_offset + offset
    }

    fn verify_enough_bytes(&self, start: usize, num_bytes: usize) -> Result<()> {
        let end = checked_add(start, num_bytes)?;
        if end > self.terminator() {
            return Err(Error::invalid_bson(format!(
                "value at offset {} needs {} bytes but only {} remain before the end of the \
                 document",
                self.absolute(start),
                num_bytes,
                self.terminator().saturating_sub(start)
            )));
        }
        Ok(())
    }

    fn next_oid(&self, starting_at: usize) -> Result<ObjectId> {
        self.verify_enough_bytes(starting_at, 12)?;
        ObjectId::from_slice(&self.bytes()[starting_at..])
    }

    fn next_document(&self, starting_at: usize) -> Result<&'a RawDocument> {
        self.verify_enough_bytes(starting_at, MIN_BSON_DOCUMENT_SIZE as usize)?;
        let size = i32_from_slice(&self.bytes()[starting_at..])?;

        if size < MIN_BSON_DOCUMENT_SIZE {
            return Err(Error::invalid_bson(format!(
                "embedded document at offset {} too small: {} bytes",
                self.absolute(starting_at),
                size
            )));
        }

        self.verify_enough_bytes(starting_at, size as usize)?;
        let end = starting_at + size as usize;
        RawDocument::from_bytes(&self.bytes()[starting_at..end]).map_err(|e| self.locate(e, starting_at))
    }

    fn next_string(&self, starting_at: usize) -> Result<&'a str> {
        self.verify_enough_bytes(starting_at, 4)?;
        let s = read_lenencode(&self.bytes()[starting_at..self.terminator()])
            .map_err(|e| self.locate(e, starting_at))?;
        Ok(s)
    }

    fn next_cstring(&self, starting_at: usize) -> Result<&'a str> {
        read_cstring(&self.bytes()[starting_at..self.terminator()])
            .map_err(|e| self.locate(e, starting_at))
    }

    /// Appends the absolute offset of the failing value to an error message.
    fn locate(&self, error: Error, at: usize) -> Error {
        match error.kind {
            ErrorKind::InvalidBson { ref message } => {
                Error::invalid_bson(format!("{message} (at offset {})", self.absolute(at)))
            }
            _ => error,
        }
    }

    fn next_binary(&self, valueoffset: usize) -> Result<(RawBinaryRef<'a>, usize)> {
        self.verify_enough_bytes(valueoffset, 4 + 1)?;
        let len = i32_from_slice(&self.bytes()[valueoffset..])?;
        if len < 0 {
            return Err(Error::invalid_bson(format!(
                "negative binary length {} at offset {}",
                len,
                self.absolute(valueoffset)
            )));
        }
        let len = len as usize;
        let data_start = valueoffset + 4 + 1;
        self.verify_enough_bytes(data_start, len)?;

        let subtype = BinarySubtype::from(self.bytes()[valueoffset + 4]);
        let bytes = match subtype {
            BinarySubtype::BinaryOld => {
                if len < 4 {
                    return Err(Error::invalid_bson(format!(
                        "old binary subtype at offset {} has no inner declared length",
                        self.absolute(valueoffset)
                    )));
                }
                let oldlength = i32_from_slice(&self.bytes()[data_start..])?;
                if i64::from(oldlength) + 4 != len as i64 {
                    return Err(Error::invalid_bson(format!(
                        "old binary subtype at offset {} has inner length {} but outer length {}",
                        self.absolute(valueoffset),
                        oldlength,
                        len
                    )));
                }
                &self.bytes()[(data_start + 4)..(data_start + len)]
            }
            _ => &self.bytes()[data_start..(data_start + len)],
        };
        Ok((RawBinaryRef { subtype, bytes }, 4 + 1 + len))
    }

    fn next_code_with_scope(
        &self,
        valueoffset: usize,
    ) -> Result<(RawJavaScriptCodeWithScopeRef<'a>, usize)> {
        self.verify_enough_bytes(valueoffset, 4)?;
        let length = i32_from_slice(&self.bytes()[valueoffset..])?;

        if length < MIN_CODE_WITH_SCOPE_SIZE {
            return Err(Error::invalid_bson(format!(
                "code with scope length {} at offset {} too small",
                length,
                self.absolute(valueoffset)
            )));
        }

        let length = length as usize;
        self.verify_enough_bytes(valueoffset, length)?;
        let slice = &self.bytes()[valueoffset..(valueoffset + length)];
        let code_len = read_len(&slice[4..]).map_err(|e| self.locate(e, valueoffset + 4))?;
        let code = read_lenencode(&slice[4..]).map_err(|e| self.locate(e, valueoffset + 4))?;
        let scope_start = 4 + code_len;
        let scope = RawDocument::from_bytes(&slice[scope_start..]).map_err(|_| {
            Error::invalid_bson(format!(
                "code with scope at offset {} has length {} inconsistent with its contents",
                self.absolute(valueoffset),
                length
            ))
        })?;
        Ok((RawJavaScriptCodeWithScopeRef { code, scope }, length))
    }

    fn next_element(&mut self) -> Result<RawElement<'a>> {
        let type_byte = self.bytes()[self.offset];
        if type_byte == 0 {
            return Err(Error::invalid_bson(format!(
                "unexpected end of document at offset {}, {} bytes before the declared end",
                self.absolute(self.offset),
                self.terminator() - self.offset
            )));
        }

        let key = self.next_cstring(self.offset + 1)?;

        try_with_key(key, || {
            let valueoffset = self.offset + 1 + key.len() + 1; // type specifier + key + \0

            let element_type = ElementType::from(type_byte).ok_or_else(|| {
                Error::invalid_bson(format!(
                    "invalid element type {:#04x} at offset {}",
                    type_byte,
                    self.absolute(self.offset)
                ))
            })?;

            let (value, element_size) = match element_type {
                ElementType::Int32 => {
                    self.verify_enough_bytes(valueoffset, 4)?;
                    (RawBsonRef::Int32(i32_from_slice(&self.bytes()[valueoffset..])?), 4)
                }
                ElementType::Int64 => {
                    self.verify_enough_bytes(valueoffset, 8)?;
                    (RawBsonRef::Int64(i64_from_slice(&self.bytes()[valueoffset..])?), 8)
                }
                ElementType::Double => {
                    self.verify_enough_bytes(valueoffset, 8)?;
                    (RawBsonRef::Double(f64_from_slice(&self.bytes()[valueoffset..])?), 8)
                }
                ElementType::String => {
                    let s = self.next_string(valueoffset)?;
                    (RawBsonRef::String(s), 4 + s.len() + 1)
                }
                ElementType::EmbeddedDocument => {
                    let doc = self.next_document(valueoffset)?;
                    (RawBsonRef::Document(doc), doc.as_bytes().len())
                }
                ElementType::Array => {
                    let doc = self.next_document(valueoffset)?;
                    (RawBsonRef::Array(doc), doc.as_bytes().len())
                }
                ElementType::Binary => {
                    let (binary, size) = self.next_binary(valueoffset)?;
                    (RawBsonRef::Binary(binary), size)
                }
                ElementType::ObjectId => {
                    let oid = self.next_oid(valueoffset)?;
                    (RawBsonRef::ObjectId(oid), 12)
                }
                ElementType::Boolean => {
                    self.verify_enough_bytes(valueoffset, 1)?;
                    let b = bool_from_slice(&self.bytes()[valueoffset..])
                        .map_err(|e| self.locate(e, valueoffset))?;
                    (RawBsonRef::Boolean(b), 1)
                }
                ElementType::DateTime => {
                    self.verify_enough_bytes(valueoffset, 8)?;
                    let ms = i64_from_slice(&self.bytes()[valueoffset..])?;
                    (RawBsonRef::DateTime(DateTime::from_millis(ms)), 8)
                }
                ElementType::RegularExpression => {
                    let pattern = self.next_cstring(valueoffset)?;
                    let options = self.next_cstring(valueoffset + pattern.len() + 1)?;
                    (
                        RawBsonRef::RegularExpression(RawRegexRef { pattern, options }),
                        pattern.len() + 1 + options.len() + 1,
                    )
                }
                ElementType::Null => (RawBsonRef::Null, 0),
                ElementType::Undefined => (RawBsonRef::Undefined, 0),
                ElementType::Timestamp => {
                    self.verify_enough_bytes(valueoffset, 8)?;
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&self.bytes()[valueoffset..valueoffset + 8]);
                    (RawBsonRef::Timestamp(Timestamp::from_le_bytes(bytes)), 8)
                }
                ElementType::JavaScriptCode => {
                    let code = self.next_string(valueoffset)?;
                    (RawBsonRef::JavaScriptCode(code), 4 + code.len() + 1)
                }
                ElementType::JavaScriptCodeWithScope => {
                    let (code_w_scope, length) = self.next_code_with_scope(valueoffset)?;
                    (RawBsonRef::JavaScriptCodeWithScope(code_w_scope), length)
                }
                ElementType::DbPointer => {
                    let namespace = self.next_string(valueoffset)?;
                    let id = self.next_oid(valueoffset + 4 + namespace.len() + 1)?;
                    (
                        RawBsonRef::DbPointer(RawDbPointerRef { namespace, id }),
                        4 + namespace.len() + 1 + 12,
                    )
                }
                ElementType::Symbol => {
                    let s = self.next_string(valueoffset)?;
                    (RawBsonRef::Symbol(s), 4 + s.len() + 1)
                }
                ElementType::Decimal128 => {
                    self.verify_enough_bytes(valueoffset, 16)?;
                    let mut bytes = [0u8; 16];
                    bytes.copy_from_slice(&self.bytes()[valueoffset..(valueoffset + 16)]);
                    (RawBsonRef::Decimal128(Decimal128::from_bytes(bytes)), 16)
                }
                ElementType::MinKey => (RawBsonRef::MinKey, 0),
                ElementType::MaxKey => (RawBsonRef::MaxKey, 0),
            };

            self.verify_enough_bytes(valueoffset, element_size)?;
            self.offset = valueoffset + element_size;

            Ok(RawElement {
                key,
                value,
                value_offset: self.absolute(valueoffset),
            })
        })
    }
}

impl<'a> Iterator for RawIter<'a> {
    type Item = Result<RawElement<'a>>;

    fn next(&mut self) -> Option<Result<RawElement<'a>>> {
        if !self.valid || self.offset == self.terminator() {
            // The terminator itself was checked when the RawDocument was constructed.
            return None;
        }

        let result = self.next_element();
        if result.is_err() {
            self.valid = false;
        }

        Some(result)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::raw::{RawBsonRef, RawDocument};

    fn first_error(bytes: &[u8]) -> String {
        let doc = RawDocument::from_bytes(bytes).unwrap();
        doc.iter()
            .find_map(|r| r.err())
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn iterates_elements() {
        // {"a": 1, "b": true}
        let bytes = b"\x10\x00\x00\x00\x10a\x00\x01\x00\x00\x00\x08b\x00\x01\x00";
        let doc = RawDocument::from_bytes(bytes).unwrap();
        let elems: Vec<_> = doc.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0].key(), "a");
        assert_eq!(elems[0].value(), RawBsonRef::Int32(1));
        assert_eq!(elems[0].value_offset(), 7);
        assert_eq!(elems[1].value(), RawBsonRef::Boolean(true));
    }

    #[test]
    fn invalid_type_byte() {
        let bytes = b"\x0c\x00\x00\x00\x1aa\x00\x01\x00\x00\x00\x00";
        assert!(first_error(bytes).contains("invalid element type 0x1a at offset 4"));
    }

    #[test]
    fn bad_boolean() {
        let bytes = b"\x09\x00\x00\x00\x08b\x00\x02\x00";
        let err = first_error(bytes);
        assert!(err.starts_with("Error at key \"b\""), "{err}");
        assert!(err.contains("boolean must be stored as 0 or 1, got 2 (at offset 7)"), "{err}");
    }

    #[test]
    fn string_overruns_document() {
        // {"s": <length 9 with only 3 bytes present>}
        let bytes = b"\x0f\x00\x00\x00\x02s\x00\x09\x00\x00\x00ab\x00\x00";
        let err = first_error(bytes);
        assert!(err.contains("string length 9 exceeds remaining"), "{err}");
    }

    #[test]
    fn element_consumes_terminator() {
        // An int32 whose last byte is the document terminator.
        let bytes = b"\x0a\x00\x00\x00\x10a\x00\x01\x00\x00";
        let err = first_error(bytes);
        assert!(err.contains("value at offset 7 needs 4 bytes but only 2 remain"), "{err}");
    }

    #[test]
    fn early_terminator() {
        let bytes = b"\x07\x00\x00\x00\x00\x00\x00";
        let err = first_error(bytes);
        assert!(err.contains("unexpected end of document at offset 4"), "{err}");
    }

    #[test]
    fn nested_length_overrun() {
        // {"d": {<declared length 64>}}
        let bytes = b"\x0d\x00\x00\x00\x03d\x00\x40\x00\x00\x00\x00\x00";
        let err = first_error(bytes);
        assert!(err.contains("value at offset 7 needs 64 bytes"), "{err}");
    }

    #[test]
    fn base_offset_shifts_reported_offsets() {
        let bytes = b"\x0c\x00\x00\x00\x1aa\x00\x01\x00\x00\x00\x00";
        let doc = RawDocument::from_bytes(bytes).unwrap();
        let err = doc.iter().with_base_offset(100).next().unwrap().unwrap_err();
        assert!(err.to_string().contains("at offset 104"));
    }

    #[test]
    fn old_binary_inner_length() {
        // subtype 2 with an outer length of 6 and an inner length of 2
        let good = b"\x13\x00\x00\x00\x05b\x00\x06\x00\x00\x00\x02\x02\x00\x00\x00hi\x00";
        let doc = RawDocument::from_bytes(good).unwrap();
        let elem = doc.iter().next().unwrap().unwrap();
        match elem.value() {
            RawBsonRef::Binary(b) => assert_eq!(b.bytes, b"hi"),
            other => panic!("unexpected {:?}", other),
        }

        let bad = b"\x13\x00\x00\x00\x05b\x00\x06\x00\x00\x00\x02\x03\x00\x00\x00hi\x00";
        assert!(first_error(bad).contains("has inner length 3 but outer length 6"));
    }
}
