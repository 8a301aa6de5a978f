//! Conversion between BSON values and [MongoDB Extended JSON](https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/).
//!
//! ## Writing
//!
//! [`ser::ExtendedJsonEncoder`] renders a [`Document`](crate::Document) as Extended JSON text in
//! one of the three [`SerializationMode`]s. The layout puts a space after every `:` and `,`:
//!
//! ```rust
//! use bsonjs::{doc, extjson::{SerializationMode, ser::ExtendedJsonEncoder}};
//!
//! let doc = doc! { "a": 1, "b": [1, 2] };
//! let relaxed = ExtendedJsonEncoder::new(SerializationMode::Relaxed).encode(&doc)?;
//! assert_eq!(relaxed, r#"{"a": 1, "b": [1, 2]}"#);
//!
//! let canonical = ExtendedJsonEncoder::new(SerializationMode::Canonical).encode(&doc)?;
//! assert_eq!(
//!     canonical,
//!     r#"{"a": {"$numberInt": "1"}, "b": [{"$numberInt": "1"}, {"$numberInt": "2"}]}"#
//! );
//! # Ok::<(), bsonjs::error::Error>(())
//! ```
//!
//! ## Reading
//!
//! [`de::JsonParser`] reads JSON text, and the `TryFrom<serde_json::Value>` implementation on
//! [`Bson`](crate::Bson) resolves Extended JSON wrapper objects into typed values. Canonical,
//! relaxed and legacy spellings are all accepted and may be mixed within a single input.
//!
//! ```rust
//! use bsonjs::{Bson, extjson::de::JsonParser};
//!
//! let value = JsonParser::parse(br#"{"x": 5, "y": {"$numberLong": "5"}}"#)?;
//! let bson = Bson::try_from(value)?;
//! assert_eq!(bson.as_document().and_then(|d| d.get("y")), Some(&Bson::Int64(5)));
//! # Ok::<(), bsonjs::error::Error>(())
//! ```

pub mod de;
pub(crate) mod models;
pub mod ser;
pub(crate) mod value;

use crate::error::{Error, Result};

/// The numeric value of [`SerializationMode::Legacy`].
pub const LEGACY: i32 = 0;

/// The numeric value of [`SerializationMode::Relaxed`].
pub const RELAXED: i32 = 1;

/// The numeric value of [`SerializationMode::Canonical`].
pub const CANONICAL: i32 = 2;

/// Controls how BSON types without a native JSON counterpart are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum SerializationMode {
    /// The legacy format produced by libbson before Extended JSON 2.0. Int64 values and dates
    /// are bare numbers, binary values use `$type` and regular expressions use `$regex`.
    Legacy,

    /// Extended JSON 2.0 relaxed mode. Numbers are bare JSON numbers and dates between 1970 and
    /// 9999 are ISO-8601 strings.
    #[default]
    Relaxed,

    /// Extended JSON 2.0 canonical mode. Every number and special type is wrapped, so the type
    /// survives a round trip.
    Canonical,
}

impl SerializationMode {
    /// The numeric code of this mode.
    pub fn as_i32(self) -> i32 {
        match self {
            SerializationMode::Legacy => LEGACY,
            SerializationMode::Relaxed => RELAXED,
            SerializationMode::Canonical => CANONICAL,
        }
    }
}

impl TryFrom<i32> for SerializationMode {
    type Error = Error;

    fn try_from(mode: i32) -> Result<Self> {
        match mode {
            LEGACY => Ok(SerializationMode::Legacy),
            RELAXED => Ok(SerializationMode::Relaxed),
            CANONICAL => Ok(SerializationMode::Canonical),
            other => Err(Error::invalid_mode(other)),
        }
    }
}

impl From<SerializationMode> for i32 {
    fn from(mode: SerializationMode) -> i32 {
        mode.as_i32()
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::SerializationMode;
    use crate::error::ErrorKind;

    #[test]
    fn mode_codes() {
        assert_eq!(SerializationMode::try_from(0).unwrap(), SerializationMode::Legacy);
        assert_eq!(SerializationMode::try_from(1).unwrap(), SerializationMode::Relaxed);
        assert_eq!(SerializationMode::try_from(2).unwrap(), SerializationMode::Canonical);
        assert_eq!(SerializationMode::default(), SerializationMode::Relaxed);
        assert_eq!(i32::from(SerializationMode::Canonical), 2);
    }

    #[test]
    fn invalid_mode() {
        let err = SerializationMode::try_from(3).unwrap_err();
        assert_matches!(err.kind, ErrorKind::InvalidMode { mode: 3 });
        assert_eq!(
            err.to_string(),
            "The value of mode must be one of: bsonjs.RELAXED, bsonjs.LEGACY, or \
             bsonjs.CANONICAL (got 3)"
        );
        assert!(SerializationMode::try_from(-1).is_err());
    }
}
