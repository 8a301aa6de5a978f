//! Rendering [`Bson`] values as Extended JSON text.

use std::io::{self, Write};

use serde::{
    Serialize,
    Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::ser::Formatter;

use crate::{
    Binary,
    Bson,
    DateTime,
    Document,
    error::{Error, Result},
    extjson::SerializationMode,
};

/// Writes [`Document`]s as Extended JSON text in a fixed [`SerializationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedJsonEncoder {
    mode: SerializationMode,
}

impl ExtendedJsonEncoder {
    /// Creates an encoder for the given mode.
    pub fn new(mode: SerializationMode) -> Self {
        Self { mode }
    }

    /// The mode this encoder renders in.
    pub fn mode(&self) -> SerializationMode {
        self.mode
    }

    /// Renders `doc` as a string.
    pub fn encode(&self, doc: &Document) -> Result<String> {
        let mut buf = Vec::new();
        self.encode_to_writer(doc, &mut buf)?;
        String::from_utf8(buf).map_err(Error::invalid_bson)
    }

    /// Renders `doc` into `writer`.
    pub fn encode_to_writer<W: Write>(&self, doc: &Document, writer: W) -> Result<()> {
        let mut serializer = serde_json::Serializer::with_formatter(writer, ExtJsonFormatter);
        ExtJson::new(doc, self.mode)
            .serialize(&mut serializer)
            .map_err(from_json_error)
    }
}

impl Bson {
    /// Renders this value as Extended JSON text in the given mode.
    ///
    /// ```rust
    /// use bsonjs::{Bson, extjson::SerializationMode};
    ///
    /// let value = Bson::Int64(42);
    /// assert_eq!(value.to_extjson_string(SerializationMode::Canonical)?, r#"{"$numberLong": "42"}"#);
    /// assert_eq!(value.to_extjson_string(SerializationMode::Relaxed)?, "42");
    /// # Ok::<(), bsonjs::error::Error>(())
    /// ```
    pub fn to_extjson_string(&self, mode: SerializationMode) -> Result<String> {
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, ExtJsonFormatter);
        ExtJson::new(self, mode)
            .serialize(&mut serializer)
            .map_err(from_json_error)?;
        String::from_utf8(buf).map_err(Error::invalid_bson)
    }
}

fn from_json_error(error: serde_json::Error) -> Error {
    if error.is_io() {
        Error::from(io::Error::from(error))
    } else {
        Error::invalid_bson(error)
    }
}

/// Puts a single space after each `:` and `,`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ExtJsonFormatter;

impl Formatter for ExtJsonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(format_double(value).as_bytes())
    }
}

/// The shortest decimal string that parses back to `value`, always containing a `.` or an
/// exponent so that it reads back as a double.
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() {
            "-Infinity".to_string()
        } else {
            "Infinity".to_string()
        };
    }

    let magnitude = value.abs();
    let mut s = if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        format!("{value:e}")
    } else {
        value.to_string()
    };
    if !s.contains(['.', 'e']) {
        s.push_str(".0");
    }
    s
}

/// A borrowed view that serializes a value as Extended JSON in the given mode.
struct ExtJson<'a, T: ?Sized> {
    value: &'a T,
    mode: SerializationMode,
}

impl<'a, T: ?Sized> ExtJson<'a, T> {
    fn new(value: &'a T, mode: SerializationMode) -> Self {
        Self { value, mode }
    }
}

impl Serialize for ExtJson<'_, Document> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.value.len()))?;
        for (key, value) in self.value {
            map.serialize_entry(key, &ExtJson::new(value, self.mode))?;
        }
        map.end()
    }
}

impl Serialize for ExtJson<'_, [Bson]> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.value.len()))?;
        for value in self.value {
            seq.serialize_element(&ExtJson::new(value, self.mode))?;
        }
        seq.end()
    }
}

/// Serializes `{"<key>": <value>}`.
fn wrapper<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &V,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}

#[derive(Serialize)]
struct BinaryBody {
    base64: String,
    #[serde(rename = "subType")]
    subtype: String,
}

#[derive(Serialize)]
struct LegacyBinary {
    #[serde(rename = "$binary")]
    base64: String,
    #[serde(rename = "$type")]
    subtype: String,
}

#[derive(Serialize)]
struct RegexBody<'a> {
    pattern: &'a str,
    options: &'a str,
}

#[derive(Serialize)]
struct LegacyRegex<'a> {
    #[serde(rename = "$regex")]
    pattern: &'a str,
    #[serde(rename = "$options")]
    options: &'a str,
}

#[derive(Serialize)]
struct TimestampBody {
    t: u32,
    i: u32,
}

#[derive(Serialize)]
struct CodeWithScope<'a> {
    #[serde(rename = "$code")]
    code: &'a str,
    #[serde(rename = "$scope")]
    scope: ExtJson<'a, Document>,
}

#[derive(Serialize)]
struct DbPointerBody<'a> {
    #[serde(rename = "$ref")]
    namespace: &'a str,
    #[serde(rename = "$id")]
    id: ObjectIdBody,
}

#[derive(Serialize)]
struct LegacyDbPointer<'a> {
    #[serde(rename = "$ref")]
    namespace: &'a str,
    #[serde(rename = "$id")]
    id: String,
}

#[derive(Serialize)]
struct ObjectIdBody {
    #[serde(rename = "$oid")]
    oid: String,
}

struct NumberLong(i64);

impl Serialize for NumberLong {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        wrapper(serializer, "$numberLong", &self.0.to_string())
    }
}

impl ExtJson<'_, Binary> {
    fn serialize_binary<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let base64 = self.value.to_base64();
        let subtype = self.value.subtype_hex();
        match self.mode {
            SerializationMode::Legacy => LegacyBinary { base64, subtype }.serialize(serializer),
            _ => wrapper(serializer, "$binary", &BinaryBody { base64, subtype }),
        }
    }
}

impl ExtJson<'_, DateTime> {
    fn serialize_date<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let millis = self.value.timestamp_millis();
        match self.mode {
            SerializationMode::Legacy => wrapper(serializer, "$date", &millis),
            SerializationMode::Relaxed if self.value.is_iso8601_representable() => {
                match self.value.try_to_iso8601_string() {
                    Ok(iso) => wrapper(serializer, "$date", &iso),
                    Err(_) => wrapper(serializer, "$date", &NumberLong(millis)),
                }
            }
            _ => wrapper(serializer, "$date", &NumberLong(millis)),
        }
    }
}

impl Serialize for ExtJson<'_, Bson> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mode = self.mode;
        let canonical = mode == SerializationMode::Canonical;
        let legacy = mode == SerializationMode::Legacy;

        match self.value {
            Bson::Double(v) if !v.is_finite() || canonical => {
                wrapper(serializer, "$numberDouble", &format_double(*v))
            }
            Bson::Double(v) => serializer.serialize_f64(*v),
            Bson::String(s) => serializer.serialize_str(s),
            Bson::Array(values) => ExtJson::new(values.as_slice(), mode).serialize(serializer),
            Bson::Document(doc) => ExtJson::new(doc, mode).serialize(serializer),
            Bson::Boolean(b) => serializer.serialize_bool(*b),
            Bson::Null => serializer.serialize_unit(),
            Bson::RegularExpression(regex) if legacy => LegacyRegex {
                pattern: &regex.pattern,
                options: &regex.options,
            }
            .serialize(serializer),
            Bson::RegularExpression(regex) => wrapper(
                serializer,
                "$regularExpression",
                &RegexBody {
                    pattern: &regex.pattern,
                    options: &regex.options,
                },
            ),
            Bson::JavaScriptCode(code) => wrapper(serializer, "$code", code),
            Bson::JavaScriptCodeWithScope(code_w_scope) => CodeWithScope {
                code: &code_w_scope.code,
                scope: ExtJson::new(&code_w_scope.scope, mode),
            }
            .serialize(serializer),
            Bson::Int32(v) if canonical => wrapper(serializer, "$numberInt", &v.to_string()),
            Bson::Int32(v) => serializer.serialize_i32(*v),
            Bson::Int64(v) if canonical => NumberLong(*v).serialize(serializer),
            Bson::Int64(v) => serializer.serialize_i64(*v),
            Bson::Timestamp(ts) => wrapper(
                serializer,
                "$timestamp",
                &TimestampBody {
                    t: ts.time,
                    i: ts.increment,
                },
            ),
            Bson::Binary(binary) => ExtJson::new(binary, mode).serialize_binary(serializer),
            Bson::ObjectId(oid) => wrapper(serializer, "$oid", &oid.to_hex()),
            Bson::DateTime(dt) => ExtJson::new(dt, mode).serialize_date(serializer),
            Bson::Symbol(s) if legacy => serializer.serialize_str(s),
            Bson::Symbol(s) => wrapper(serializer, "$symbol", s),
            Bson::Decimal128(d) => wrapper(serializer, "$numberDecimal", &d.to_string()),
            Bson::Undefined => wrapper(serializer, "$undefined", &true),
            Bson::MinKey => wrapper(serializer, "$minKey", &1),
            Bson::MaxKey => wrapper(serializer, "$maxKey", &1),
            Bson::DbPointer(pointer) if legacy => LegacyDbPointer {
                namespace: &pointer.namespace,
                id: pointer.id.to_hex(),
            }
            .serialize(serializer),
            Bson::DbPointer(pointer) => wrapper(
                serializer,
                "$dbPointer",
                &DbPointerBody {
                    namespace: &pointer.namespace,
                    id: ObjectIdBody {
                        oid: pointer.id.to_hex(),
                    },
                },
            ),
        }
    }
}
