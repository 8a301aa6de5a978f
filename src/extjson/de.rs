//! Reading [MongoDB Extended JSON](https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/)
//!
//! ## Usage
//!
//! [`JsonParser::parse_document`] reads JSON text straight into a [`Document`], keeping object
//! members in order and keeping repeated keys. Extended JSON wrappers are also resolved through
//! [`Bson`]'s `TryFrom<serde_json::Value>` implementation, which accepts canonical, relaxed and
//! legacy spellings, mixed freely within a single value.
//!
//! ```rust
//! # use bsonjs::Bson;
//! # use serde_json::json;
//! let json_doc = json!({ "x": 5i32, "y": { "$numberInt": "5" }, "z": { "subdoc": "hello" } });
//! let bson = Bson::try_from(json_doc)?; // Bson::Document(...)
//!
//! let json_date = json!({ "$date": { "$numberLong": "1590972160292" } });
//! let bson_date = Bson::try_from(json_date)?; // Bson::DateTime(...)
//!
//! let invalid_ext_json = json!({ "$numberLong": 5 });
//! assert!(Bson::try_from(invalid_ext_json).is_err()); // 5 should be a string
//! # Ok::<(), bsonjs::error::Error>(())
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::{
    Bson,
    Document,
    error::{Error, Result, try_with_key},
    extjson::{
        models,
        value::{JsonObject, JsonValue},
    },
};

/// Reads JSON text.
pub struct JsonParser;

impl JsonParser {
    /// Parses the first JSON value in `text`. Anything after that value is ignored.
    ///
    /// Syntax errors are reported as [`ErrorKind::MalformedJson`](crate::error::ErrorKind) with
    /// the byte offset at which they were detected. A [`serde_json::Value`] keeps one member per
    /// key; use [`JsonParser::parse_document`] to keep repeated keys.
    pub fn parse(text: &[u8]) -> Result<Value> {
        first_value(text)
    }

    /// Parses `text` and resolves it into a top-level document.
    ///
    /// The top-level value must be an object, and that object must not itself be an Extended
    /// JSON wrapper. Members keep their order, and a key that appears more than once yields one
    /// document entry per appearance.
    pub fn parse_document(text: &[u8]) -> Result<Document> {
        match first_value(text)? {
            JsonValue::Object(obj) => match resolve_object(obj)? {
                Bson::Document(doc) => Ok(doc),
                other => Err(Error::malformed_json(format!(
                    "top-level value must be a document, got {:?}",
                    other.element_type()
                ))),
            },
            other => Err(Error::malformed_json(format!(
                "top-level value must be an object, got {}",
                other.type_name()
            ))),
        }
    }
}

fn first_value<T: DeserializeOwned>(text: &[u8]) -> Result<T> {
    let mut values = serde_json::Deserializer::from_slice(text).into_iter::<T>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(located_error(text, &e)),
        None => Err(Error::malformed_json_at(
            "expected a JSON value, found end of input",
            text.len(),
        )),
    }
}

/// Converts `serde_json`'s 1-based line and column into a byte offset into `text`.
fn located_error(text: &[u8], error: &serde_json::Error) -> Error {
    let (line, column) = (error.line(), error.column());
    let message = error.to_string();
    let message = message
        .strip_suffix(&format!(" at line {} column {}", line, column))
        .unwrap_or(&message);

    let line_start = if line <= 1 {
        0
    } else {
        text.iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map_or(text.len(), |(i, _)| i + 1)
    };
    let offset = (line_start + column.saturating_sub(1)).min(text.len());

    Error::malformed_json_at(message, offset)
}

/// Decodes a wrapper object through its serde model.
fn from_model<T: DeserializeOwned>(obj: JsonObject) -> Result<T> {
    serde_json::from_value(Value::Object(obj.into_map()?)).map_err(Error::malformed_json)
}

type NumberResolver = fn(&Number) -> Option<Bson>;

/// How bare JSON numbers map onto BSON numeric types. The first resolver that accepts a number
/// wins: integers become Int32 when they fit and Int64 otherwise, and everything else, including
/// integers beyond the range of i64, becomes a Double.
const NUMBER_RESOLUTION: &[NumberResolver] = &[
    |n| n.as_i64().and_then(|i| i32::try_from(i).ok()).map(Bson::Int32),
    |n| n.as_i64().map(Bson::Int64),
    |n| n.as_f64().map(Bson::Double),
];

fn resolve_number(number: &Number) -> Result<Bson> {
    NUMBER_RESOLUTION
        .iter()
        .find_map(|resolve| resolve(number))
        .ok_or_else(|| {
            Error::malformed_json(format!(
                "number {} cannot be represented as i32, i64 or f64",
                number
            ))
        })
}

/// Converts the [`serde_json::Map`] into [`Bson`]. This conversion can interpret canonical,
/// relaxed and legacy [extended JSON](https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/).
impl TryFrom<Map<String, Value>> for Bson {
    type Error = Error;

    fn try_from(obj: Map<String, Value>) -> Result<Self> {
        resolve_object(obj.into())
    }
}

/// Converts the [`serde_json::Value`] into [`Bson`], resolving Extended JSON wrappers and
/// mapping bare numbers through the number resolution table.
impl TryFrom<Value> for Bson {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        resolve_value(value.into())
    }
}

/// Converts the [`serde_json::Map`] into a [`Document`] without checking whether the map itself
/// is an Extended JSON wrapper. Values are resolved as usual.
impl TryFrom<Map<String, Value>> for Document {
    type Error = Error;

    fn try_from(obj: Map<String, Value>) -> Result<Self> {
        resolve_document(obj.into())
    }
}

fn resolve_value(value: JsonValue) -> Result<Bson> {
    match value {
        JsonValue::Number(x) => resolve_number(&x),
        JsonValue::String(x) => Ok(x.into()),
        JsonValue::Bool(x) => Ok(x.into()),
        JsonValue::Array(x) => Ok(Bson::Array(
            x.into_iter().map(resolve_value).collect::<Result<_>>()?,
        )),
        JsonValue::Null => Ok(Bson::Null),
        JsonValue::Object(obj) => resolve_object(obj),
    }
}

fn resolve_object(obj: JsonObject) -> Result<Bson> {
    resolve_wrapper(obj).map_err(Error::into_malformed_json)
}

fn resolve_document(obj: JsonObject) -> Result<Document> {
    obj.into_iter()
        .map(|(k, v)| -> Result<(String, Bson)> {
            if k.contains('\0') {
                return Err(Error::malformed_json(format!(
                    "key {:?} contains a null byte",
                    k
                )));
            }
            let value = try_with_key(&k, || resolve_value(v))?;
            Ok((k, value))
        })
        .collect()
}

fn resolve_wrapper(mut obj: JsonObject) -> Result<Bson> {
    if obj.contains_key("$oid") {
        let oid: models::ObjectId = from_model(obj)?;
        return Ok(Bson::ObjectId(oid.parse()?));
    }

    if obj.contains_key("$symbol") {
        let symbol: models::Symbol = from_model(obj)?;
        return Ok(Bson::Symbol(symbol.value));
    }

    if obj.contains_key("$regularExpression") {
        let regex: models::Regex = from_model(obj)?;
        return Ok(regex.parse().into());
    }

    if obj.contains_key("$numberInt") {
        let int: models::Int32 = from_model(obj)?;
        return Ok(Bson::Int32(int.parse()?));
    }

    if obj.contains_key("$numberLong") {
        let int: models::Int64 = from_model(obj)?;
        return Ok(Bson::Int64(int.parse()?));
    }

    if obj.contains_key("$numberDouble") {
        let double: models::Double = from_model(obj)?;
        return Ok(Bson::Double(double.parse()?));
    }

    if obj.contains_key("$numberDecimal") {
        let decimal: models::Decimal128 = from_model(obj)?;
        return Ok(Bson::Decimal128(decimal.parse()?));
    }

    if let Some(legacy) = obj.get("$binary").map(|v| matches!(v, JsonValue::String(_))) {
        if legacy {
            let binary: models::LegacyBinary = from_model(obj)?;
            return Ok(Bson::Binary(binary.parse()?));
        }
        let binary: models::Binary = from_model(obj)?;
        return Ok(Bson::Binary(binary.parse()?));
    }

    if obj.contains_key("$uuid") {
        let uuid: models::Uuid = from_model(obj)?;
        return Ok(Bson::Binary(uuid.parse()?));
    }

    if obj.contains_key("$code") {
        // The scope is a document of its own, so it is resolved from the ordered members.
        let scope = obj.remove("$scope");
        let code: models::JavaScriptCode = from_model(obj)?;
        return match scope {
            None => Ok(Bson::JavaScriptCode(code.code)),
            Some(JsonValue::Object(scope)) => Ok(crate::JavaScriptCodeWithScope {
                code: code.code,
                scope: resolve_document(scope)?,
            }
            .into()),
            Some(other) => Err(Error::malformed_json(format!(
                "$scope must be an object, got {}",
                other.type_name()
            ))),
        };
    }

    if obj.contains_key("$timestamp") {
        let ts: models::Timestamp = from_model(obj)?;
        return Ok(ts.parse().into());
    }

    // A `$regex` holding anything but a string is a query operator, not a regular expression.
    if matches!(obj.get("$regex"), Some(JsonValue::String(_))) {
        let regex: models::LegacyRegex = from_model(obj)?;
        return Ok(regex.parse().into());
    }

    if obj.contains_key("$date") {
        let extjson_datetime: models::DateTime = from_model(obj)?;
        return Ok(Bson::DateTime(extjson_datetime.parse()?));
    }

    if obj.contains_key("$minKey") {
        let min_key: models::MinKey = from_model(obj)?;
        return min_key.parse();
    }

    if obj.contains_key("$maxKey") {
        let max_key: models::MaxKey = from_model(obj)?;
        return max_key.parse();
    }

    if obj.contains_key("$dbPointer") {
        let db_ptr: models::DbPointer = from_model(obj)?;
        return Ok(db_ptr.parse()?.into());
    }

    if obj.contains_key("$undefined") {
        let undefined: models::Undefined = from_model(obj)?;
        return undefined.parse();
    }

    Ok(Bson::Document(resolve_document(obj)?))
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::JsonParser;
    use crate::{
        Binary,
        Bson,
        DateTime,
        Document,
        Regex,
        Timestamp,
        doc,
        error::ErrorKind,
        oid::ObjectId,
        spec::BinarySubtype,
    };

    fn resolve(value: serde_json::Value) -> crate::error::Result<Bson> {
        Bson::try_from(value)
    }

    #[test]
    fn numbers() {
        assert_eq!(resolve(json!(1)).unwrap(), Bson::Int32(1));
        assert_eq!(resolve(json!(-2147483648i64)).unwrap(), Bson::Int32(i32::MIN));
        assert_eq!(resolve(json!(2147483648i64)).unwrap(), Bson::Int64(2147483648));
        assert_eq!(resolve(json!(u64::MAX)).unwrap(), Bson::Double(u64::MAX as f64));
        assert_eq!(resolve(json!(1.0)).unwrap(), Bson::Double(1.0));
    }

    #[test]
    fn canonical_wrappers() {
        assert_eq!(resolve(json!({ "$numberInt": "42" })).unwrap(), Bson::Int32(42));
        assert_eq!(resolve(json!({ "$numberLong": "42" })).unwrap(), Bson::Int64(42));
        assert_eq!(
            resolve(json!({ "$numberDouble": "-0.0" })).unwrap(),
            Bson::Double(-0.0)
        );
        assert_matches!(
            resolve(json!({ "$numberDouble": "NaN" })).unwrap(),
            Bson::Double(d) if d.is_nan()
        );
        assert_eq!(
            resolve(json!({ "$oid": "57e193d7a9cc81b4027498b5" })).unwrap(),
            Bson::ObjectId(ObjectId::parse_str("57e193d7a9cc81b4027498b5").unwrap())
        );
        assert_eq!(
            resolve(json!({ "$timestamp": { "t": 123, "i": 456 } })).unwrap(),
            Bson::Timestamp(Timestamp { time: 123, increment: 456 })
        );
        assert_eq!(
            resolve(json!({ "$date": { "$numberLong": "-1" } })).unwrap(),
            Bson::DateTime(DateTime::from_millis(-1))
        );
        assert_eq!(
            resolve(json!({ "$code": "x", "$scope": { "y": 1 } })).unwrap(),
            Bson::JavaScriptCodeWithScope(crate::JavaScriptCodeWithScope {
                code: "x".into(),
                scope: doc! { "y": 1 },
            })
        );
        assert_eq!(resolve(json!({ "$minKey": 1 })).unwrap(), Bson::MinKey);
        assert_eq!(resolve(json!({ "$undefined": true })).unwrap(), Bson::Undefined);
    }

    #[test]
    fn legacy_spellings() {
        assert_eq!(
            resolve(json!({ "$binary": "AQID", "$type": "0" })).unwrap(),
            Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: vec![1, 2, 3]
            })
        );
        assert_eq!(
            resolve(json!({ "$regex": "^a", "$options": "mi" })).unwrap(),
            Bson::RegularExpression(Regex::new("^a", "mi"))
        );
        assert_eq!(
            resolve(json!({ "$regex": "^a" })).unwrap(),
            Bson::RegularExpression(Regex::new("^a", ""))
        );
        assert_eq!(
            resolve(json!({ "$date": 1356351330501i64 })).unwrap(),
            Bson::DateTime(DateTime::from_millis(1_356_351_330_501))
        );
        assert_eq!(
            resolve(json!({ "$date": "2012-12-24T12:15:30.501Z" })).unwrap(),
            Bson::DateTime(DateTime::from_millis(1_356_351_330_501))
        );
        assert_eq!(
            resolve(json!({ "$uuid": "c8edabc3-f738-4ca3-b68d-ab92a91478a3" })).unwrap(),
            Bson::Binary(Binary {
                subtype: BinarySubtype::Uuid,
                bytes: vec![
                    0xc8, 0xed, 0xab, 0xc3, 0xf7, 0x38, 0x4c, 0xa3, 0xb6, 0x8d, 0xab, 0x92, 0xa9,
                    0x14, 0x78, 0xa3
                ],
            })
        );
    }

    #[test]
    fn query_operators_are_documents() {
        let mut expected = Document::new();
        expected.push("$regex", doc! { "$ne": 1 });
        assert_eq!(
            resolve(json!({ "$regex": { "$ne": 1 } })).unwrap(),
            Bson::Document(expected)
        );
        assert_eq!(
            resolve(json!({ "$type": "string" })).unwrap(),
            Bson::Document(doc! { "$type": "string" })
        );
        assert_eq!(
            resolve(json!({ "$ref": "c", "$id": 1 })).unwrap(),
            Bson::Document(doc! { "$ref": "c", "$id": 1 })
        );
    }

    #[test]
    fn invalid_wrappers() {
        for value in [
            json!({ "$oid": "57e193d7a9cc81b4027498b" }),
            json!({ "$oid": "57e193d7a9cc81b4027498b5", "foo": 1 }),
            json!({ "$numberLong": 5 }),
            json!({ "$numberLong": "five" }),
            json!({ "$numberInt": "2147483648" }),
            json!({ "$numberDouble": "inf" }),
            json!({ "$binary": { "base64": "!!", "subType": "00" } }),
            json!({ "$binary": { "base64": "AA==", "subType": "100" } }),
            json!({ "$binary": "AA==" }),
            json!({ "$date": "yesterday" }),
            json!({ "$minKey": 0 }),
            json!({ "$undefined": false }),
            json!({ "$numberDecimal": "1.2.3" }),
            json!({ "$numberDouble": "1e400" }),
            json!({ "$numberDouble": "-1e400" }),
            json!({ "$numberInt": "+7" }),
            json!({ "$numberLong": "+7" }),
            json!({ "$date": { "$numberLong": "+1" } }),
            json!({ "$code": "x", "$scope": 1 }),
        ] {
            let err = resolve(value.clone()).unwrap_err();
            assert!(err.is_malformed_json(), "{value}: {err}");
        }
    }

    #[test]
    fn errors_name_the_innermost_key() {
        let err = resolve(json!({ "a": { "b": { "$numberInt": "x" } } })).unwrap_err();
        assert_eq!(err.key.as_deref(), Some("b"));
    }

    #[test]
    fn null_bytes_in_keys() {
        let err = resolve(json!({ "a\u{0}b": 1 })).unwrap_err();
        assert!(err.is_malformed_json());
    }

    #[test]
    fn parser_offsets() {
        let err = JsonParser::parse(b"{\"a\": }").unwrap_err();
        assert_matches!(err.kind, ErrorKind::MalformedJson { offset: Some(6), .. });

        let err = JsonParser::parse(b"{\"a\": 1,\n \"b\": x}").unwrap_err();
        assert_matches!(err.kind, ErrorKind::MalformedJson { offset: Some(15), .. });

        let err = JsonParser::parse(b"").unwrap_err();
        assert_matches!(err.kind, ErrorKind::MalformedJson { offset: Some(0), .. });
    }

    #[test]
    fn parser_ignores_trailing_text() {
        let value = JsonParser::parse(br#"{"a": 1}{"b": 2} garbage"#).unwrap();
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn repeated_keys_become_repeated_entries() {
        let doc = JsonParser::parse_document(
            br#"{"k": {"$numberInt": "1"}, "j": 0, "k": {"$numberInt": "2"}}"#,
        )
        .unwrap();
        let mut expected = Document::new();
        expected.push("k", 1);
        expected.push("j", 0);
        expected.push("k", 2);
        assert_eq!(doc, expected);

        let doc = JsonParser::parse_document(br#"{"outer": {"a": 1, "a": "one"}}"#).unwrap();
        let mut inner = Document::new();
        inner.push("a", 1);
        inner.push("a", "one");
        assert_eq!(doc, doc! { "outer": (inner.clone()) });

        let doc =
            JsonParser::parse_document(br#"{"c": {"$code": "f", "$scope": {"a": 1, "a": "one"}}}"#)
                .unwrap();
        assert_eq!(
            doc.get("c"),
            Some(&Bson::JavaScriptCodeWithScope(crate::JavaScriptCodeWithScope {
                code: "f".into(),
                scope: inner,
            }))
        );
    }

    #[test]
    fn repeated_keys_inside_wrappers() {
        for text in [
            r#"{"a": {"$numberInt": "1", "$numberInt": "2"}}"#,
            r#"{"a": {"$timestamp": {"t": 1, "t": 2, "i": 3}}}"#,
            r#"{"a": {"$code": "f", "$scope": {}, "$scope": {}}}"#,
        ] {
            let err = JsonParser::parse_document(text.as_bytes()).unwrap_err();
            assert!(err.is_malformed_json(), "{text}: {err}");
        }
    }

    #[test]
    fn top_level_must_be_a_plain_document() {
        assert_eq!(
            JsonParser::parse_document(br#"{"a": {"$numberLong": "1"}}"#).unwrap(),
            doc! { "a": (1i64) }
        );
        assert!(JsonParser::parse_document(br#"{"$numberLong": "1"}"#)
            .unwrap_err()
            .is_malformed_json());
        assert!(JsonParser::parse_document(b"[1, 2]").unwrap_err().is_malformed_json());
        assert!(JsonParser::parse_document(b"42").unwrap_err().is_malformed_json());
    }
}
