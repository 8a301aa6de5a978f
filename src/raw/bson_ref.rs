use crate::{
    Binary,
    Bson,
    DateTime,
    DbPointer,
    Decimal128,
    Regex,
    Timestamp,
    oid::ObjectId,
    spec::{BinarySubtype, ElementType},
};

use super::RawDocument;

/// A BSON value referencing raw bytes stored elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawBsonRef<'a> {
    /// 64-bit binary floating point
    Double(f64),
    /// UTF-8 string
    String(&'a str),
    /// Array, stored as a document whose keys are ignored
    Array(&'a RawDocument),
    /// Embedded document
    Document(&'a RawDocument),
    /// Boolean value
    Boolean(bool),
    /// Null value
    Null,
    /// Regular expression
    RegularExpression(RawRegexRef<'a>),
    /// JavaScript code
    JavaScriptCode(&'a str),
    /// JavaScript code w/ scope
    JavaScriptCodeWithScope(RawJavaScriptCodeWithScopeRef<'a>),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// Timestamp
    Timestamp(Timestamp),
    /// Binary data
    Binary(RawBinaryRef<'a>),
    /// [ObjectId](http://dochub.mongodb.org/core/objectids)
    ObjectId(ObjectId),
    /// UTC datetime
    DateTime(DateTime),
    /// Symbol (Deprecated)
    Symbol(&'a str),
    /// [128-bit decimal floating point](https://github.com/mongodb/specifications/blob/master/source/bson-decimal128/decimal128.md)
    Decimal128(Decimal128),
    /// Undefined value (Deprecated)
    Undefined,
    /// Max key
    MaxKey,
    /// Min key
    MinKey,
    /// DBPointer (Deprecated)
    DbPointer(RawDbPointerRef<'a>),
}

impl RawBsonRef<'_> {
    /// Get the [`ElementType`] of this value.
    pub fn element_type(&self) -> ElementType {
        match *self {
            RawBsonRef::Double(..) => ElementType::Double,
            RawBsonRef::String(..) => ElementType::String,
            RawBsonRef::Array(..) => ElementType::Array,
            RawBsonRef::Document(..) => ElementType::EmbeddedDocument,
            RawBsonRef::Boolean(..) => ElementType::Boolean,
            RawBsonRef::Null => ElementType::Null,
            RawBsonRef::RegularExpression(..) => ElementType::RegularExpression,
            RawBsonRef::JavaScriptCode(..) => ElementType::JavaScriptCode,
            RawBsonRef::JavaScriptCodeWithScope(..) => ElementType::JavaScriptCodeWithScope,
            RawBsonRef::Int32(..) => ElementType::Int32,
            RawBsonRef::Int64(..) => ElementType::Int64,
            RawBsonRef::Timestamp(..) => ElementType::Timestamp,
            RawBsonRef::Binary(..) => ElementType::Binary,
            RawBsonRef::ObjectId(..) => ElementType::ObjectId,
            RawBsonRef::DateTime(..) => ElementType::DateTime,
            RawBsonRef::Symbol(..) => ElementType::Symbol,
            RawBsonRef::Decimal128(..) => ElementType::Decimal128,
            RawBsonRef::Undefined => ElementType::Undefined,
            RawBsonRef::MaxKey => ElementType::MaxKey,
            RawBsonRef::MinKey => ElementType::MinKey,
            RawBsonRef::DbPointer(..) => ElementType::DbPointer,
        }
    }

    /// Converts a scalar value into its owned [`Bson`] form.
    ///
    /// Container values (documents, arrays and code with scope) return [`None`], since
    /// converting them requires walking their children.
    pub(crate) fn to_scalar_bson(self) -> Option<Bson> {
        Some(match self {
            RawBsonRef::Double(d) => Bson::Double(d),
            RawBsonRef::String(s) => Bson::String(s.to_string()),
            RawBsonRef::Boolean(b) => Bson::Boolean(b),
            RawBsonRef::Null => Bson::Null,
            RawBsonRef::RegularExpression(re) => {
                Bson::RegularExpression(Regex::new(re.pattern, re.options))
            }
            RawBsonRef::JavaScriptCode(c) => Bson::JavaScriptCode(c.to_string()),
            RawBsonRef::Int32(i) => Bson::Int32(i),
            RawBsonRef::Int64(i) => Bson::Int64(i),
            RawBsonRef::Timestamp(ts) => Bson::Timestamp(ts),
            RawBsonRef::Binary(b) => Bson::Binary(Binary {
                subtype: b.subtype,
                bytes: b.bytes.to_vec(),
            }),
            RawBsonRef::ObjectId(oid) => Bson::ObjectId(oid),
            RawBsonRef::DateTime(dt) => Bson::DateTime(dt),
            RawBsonRef::Symbol(s) => Bson::Symbol(s.to_string()),
            RawBsonRef::Decimal128(d) => Bson::Decimal128(d),
            RawBsonRef::Undefined => Bson::Undefined,
            RawBsonRef::MaxKey => Bson::MaxKey,
            RawBsonRef::MinKey => Bson::MinKey,
            RawBsonRef::DbPointer(d) => Bson::DbPointer(DbPointer {
                namespace: d.namespace.to_string(),
                id: d.id,
            }),
            RawBsonRef::Document(_)
            | RawBsonRef::Array(_)
            | RawBsonRef::JavaScriptCodeWithScope(_) => return None,
        })
    }
}

/// A BSON binary value referencing raw bytes stored elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawBinaryRef<'a> {
    /// The subtype of the binary value.
    pub subtype: BinarySubtype,

    /// The binary bytes, without the inner length of the old binary subtype.
    pub bytes: &'a [u8],
}

/// A BSON regex referencing raw bytes stored elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawRegexRef<'a> {
    /// The regex pattern to match.
    pub pattern: &'a str,

    /// The options for the regex.
    pub options: &'a str,
}

/// A BSON "code with scope" value referencing raw bytes stored elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawJavaScriptCodeWithScopeRef<'a> {
    /// The JavaScript code.
    pub code: &'a str,

    /// The scope document containing variable bindings.
    pub scope: &'a RawDocument,
}

impl RawJavaScriptCodeWithScopeRef<'_> {
    /// Offset of the scope document relative to the start of the code with scope value.
    pub(crate) fn scope_offset(&self) -> usize {
        4 + 4 + self.code.len() + 1
    }
}

/// A BSON DB pointer value referencing raw bytes stored elsewhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDbPointerRef<'a> {
    pub(crate) namespace: &'a str,
    pub(crate) id: ObjectId,
}
