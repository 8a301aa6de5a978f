//! A module defining serde models for the extended JSON representations of the various BSON types.

use serde::Deserialize;

use crate::{
    Bson,
    binary::parse_subtype_hex,
    error::{Error, Result},
    oid,
    spec::BinarySubtype,
};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Int32 {
    #[serde(rename = "$numberInt")]
    value: String,
}

impl Int32 {
    pub(crate) fn parse(self) -> Result<i32> {
        parse_integer(&self.value).ok_or_else(|| {
            Error::malformed_json(format!("expected i32 as a string, got {:?}", self.value))
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Int64 {
    #[serde(rename = "$numberLong")]
    value: String,
}

impl Int64 {
    pub(crate) fn parse(self) -> Result<i64> {
        parse_integer(&self.value).ok_or_else(|| {
            Error::malformed_json(format!("expected i64 as a string, got {:?}", self.value))
        })
    }
}

/// Integers are an optional `-` followed by digits. Rust's parser also takes a leading `+`.
fn parse_integer<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.starts_with('+') {
        return None;
    }
    s.parse().ok()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Double {
    #[serde(rename = "$numberDouble")]
    value: String,
}

impl Double {
    pub(crate) fn parse(self) -> Result<f64> {
        match self.value.as_str() {
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            // Rust's float parser also accepts "inf" and "nan", which are not extended JSON.
            other if other.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') => {
                Err(Error::malformed_json(format!(
                    "expected bson double as a string, got {:?}",
                    other
                )))
            }
            other => match other.parse::<f64>() {
                Ok(d) if d.is_finite() => Ok(d),
                Ok(_) => Err(Error::malformed_json(format!(
                    "{:?} is out of range for a bson double",
                    other
                ))),
                Err(_) => Err(Error::malformed_json(format!(
                    "expected bson double as a string, got {:?}",
                    other
                ))),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Decimal128 {
    #[serde(rename = "$numberDecimal")]
    value: String,
}

impl Decimal128 {
    pub(crate) fn parse(self) -> Result<crate::Decimal128> {
        self.value.parse()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectId {
    #[serde(rename = "$oid")]
    oid: String,
}

impl ObjectId {
    pub(crate) fn parse(self) -> Result<oid::ObjectId> {
        oid::ObjectId::parse_str(self.oid.as_str())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Symbol {
    #[serde(rename = "$symbol")]
    pub(crate) value: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Regex {
    #[serde(rename = "$regularExpression")]
    body: RegexBody,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegexBody {
    pattern: String,
    options: String,
}

impl Regex {
    pub(crate) fn parse(self) -> crate::Regex {
        crate::Regex::new(self.body.pattern, self.body.options)
    }
}

/// `{"$regex": <pattern>, "$options": <options>}`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LegacyRegex {
    #[serde(rename = "$regex")]
    pattern: String,

    #[serde(rename = "$options", default)]
    options: String,
}

impl LegacyRegex {
    pub(crate) fn parse(self) -> crate::Regex {
        crate::Regex::new(self.pattern, self.options)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Binary {
    #[serde(rename = "$binary")]
    body: BinaryBody,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BinaryBody {
    base64: String,

    #[serde(rename = "subType")]
    subtype: String,
}

impl Binary {
    pub(crate) fn parse(self) -> Result<crate::Binary> {
        let subtype = parse_subtype_hex(&self.body.subtype)?;
        crate::Binary::from_base64(&self.body.base64, subtype)
    }
}

/// `{"$binary": <base64>, "$type": <hex subtype>}`
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LegacyBinary {
    #[serde(rename = "$binary")]
    base64: String,

    #[serde(rename = "$type")]
    subtype: String,
}

impl LegacyBinary {
    pub(crate) fn parse(self) -> Result<crate::Binary> {
        let subtype = parse_subtype_hex(&self.subtype)?;
        crate::Binary::from_base64(&self.base64, subtype)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Uuid {
    #[serde(rename = "$uuid")]
    value: String,
}

impl Uuid {
    pub(crate) fn parse(self) -> Result<crate::Binary> {
        let uuid = uuid::Uuid::parse_str(&self.value).map_err(|e| {
            Error::malformed_json(format!(
                "$uuid value {:?} is not a valid UUID: {}",
                self.value, e
            ))
        })?;

        Ok(crate::Binary {
            subtype: BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct JavaScriptCode {
    #[serde(rename = "$code")]
    pub(crate) code: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Timestamp {
    #[serde(rename = "$timestamp")]
    body: TimestampBody,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TimestampBody {
    t: u32,
    i: u32,
}

impl Timestamp {
    pub(crate) fn parse(self) -> crate::Timestamp {
        crate::Timestamp {
            time: self.body.t,
            increment: self.body.i,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DateTime {
    #[serde(rename = "$date")]
    body: DateTimeBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateTimeBody {
    Canonical(Int64),
    Relaxed(String),
    Legacy(i64),
}

impl DateTime {
    pub(crate) fn parse(self) -> Result<crate::DateTime> {
        match self.body {
            DateTimeBody::Canonical(date) => Ok(crate::DateTime::from_millis(date.parse()?)),
            DateTimeBody::Relaxed(date) => crate::DateTime::parse_iso8601(&date),
            DateTimeBody::Legacy(millis) => Ok(crate::DateTime::from_millis(millis)),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MinKey {
    #[serde(rename = "$minKey")]
    value: u8,
}

impl MinKey {
    pub(crate) fn parse(self) -> Result<Bson> {
        if self.value == 1 {
            Ok(Bson::MinKey)
        } else {
            Err(Error::malformed_json(format!(
                "value of $minKey should always be 1, got {}",
                self.value
            )))
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MaxKey {
    #[serde(rename = "$maxKey")]
    value: u8,
}

impl MaxKey {
    pub(crate) fn parse(self) -> Result<Bson> {
        if self.value == 1 {
            Ok(Bson::MaxKey)
        } else {
            Err(Error::malformed_json(format!(
                "value of $maxKey should always be 1, got {}",
                self.value
            )))
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DbPointer {
    #[serde(rename = "$dbPointer")]
    body: DbPointerBody,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DbPointerBody {
    #[serde(rename = "$ref")]
    ref_ns: String,

    #[serde(rename = "$id")]
    id: ObjectId,
}

impl DbPointer {
    pub(crate) fn parse(self) -> Result<crate::DbPointer> {
        Ok(crate::DbPointer {
            namespace: self.body.ref_ns,
            id: self.body.id.parse()?,
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Undefined {
    #[serde(rename = "$undefined")]
    value: bool,
}

impl Undefined {
    pub(crate) fn parse(self) -> Result<Bson> {
        if self.value {
            Ok(Bson::Undefined)
        } else {
            Err(Error::malformed_json("$undefined should always be true"))
        }
    }
}
