//! Contains the error-related types for the `bsonjs` crate.

mod datetime;
mod decimal128;
mod oid;

use thiserror::Error;

pub use datetime::DateTimeErrorKind;
pub use decimal128::Decimal128ErrorKind;
pub use oid::ObjectIdErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `bsonjs` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,

    /// The innermost document key associated with the error, if any.
    pub key: Option<String>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(key) = self.key.as_deref() {
            write!(f, "Error at key \"{key}\": ")?;
        }

        write!(f, "{}", self.kind)
    }
}

/// The types of errors that can occur in the `bsonjs` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input bytes were not a well-formed BSON document, or a value could not be represented
    /// in BSON.
    #[error("invalid BSON document: {message}")]
    #[non_exhaustive]
    InvalidBson { message: String },

    /// A serialization mode outside of the supported set was requested.
    #[error(
        "The value of mode must be one of: bsonjs.RELAXED, bsonjs.LEGACY, or bsonjs.CANONICAL \
         (got {mode})"
    )]
    #[non_exhaustive]
    InvalidMode { mode: i32 },

    /// The input text was not valid JSON, or contained an extended JSON wrapper with an invalid
    /// shape.
    #[error("{}", malformed_json_message(.message, .offset))]
    #[non_exhaustive]
    MalformedJson {
        message: String,

        /// The byte offset into the input at which the error was detected, if known.
        offset: Option<usize>,
    },

    /// An encoded document exceeded the maximum allowed size.
    #[error("document too large: {length} bytes exceeds the maximum of {max}")]
    #[non_exhaustive]
    TooLarge { length: usize, max: usize },

    /// An error related to the [`ObjectId`](crate::oid::ObjectId) type occurred.
    #[error("An ObjectId-related error occurred: {kind}")]
    #[non_exhaustive]
    ObjectId { kind: ObjectIdErrorKind },

    /// An error related to the [`Decimal128`](crate::Decimal128) type occurred.
    #[error("A Decimal128-related error occurred: {kind}")]
    #[non_exhaustive]
    Decimal128 { kind: Decimal128ErrorKind },

    /// An error related to the [`DateTime`](crate::DateTime) type occurred.
    #[error("A DateTime-related error occurred: {kind}")]
    #[non_exhaustive]
    DateTime { kind: DateTimeErrorKind },

    /// A [`std::io::Error`] occurred.
    #[error("An IO error occurred: {0}")]
    Io(std::io::Error),
}

fn malformed_json_message(message: &str, offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!("malformed JSON at offset {offset}: {message}"),
        None => format!("malformed JSON: {message}"),
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, key: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        ErrorKind::Io(value).into()
    }
}

impl Error {
    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches `key` unless a deeper key has already been recorded.
    pub(crate) fn with_key_if_absent(self, key: impl Into<String>) -> Self {
        if self.key.is_some() {
            self
        } else {
            self.with_key(key)
        }
    }

    pub(crate) fn invalid_bson(message: impl ToString) -> Self {
        ErrorKind::InvalidBson {
            message: message.to_string(),
        }
        .into()
    }

    pub(crate) fn invalid_mode(mode: i32) -> Self {
        ErrorKind::InvalidMode { mode }.into()
    }

    pub(crate) fn malformed_json(message: impl ToString) -> Self {
        ErrorKind::MalformedJson {
            message: message.to_string(),
            offset: None,
        }
        .into()
    }

    pub(crate) fn malformed_json_at(message: impl ToString, offset: usize) -> Self {
        ErrorKind::MalformedJson {
            message: message.to_string(),
            offset: Some(offset),
        }
        .into()
    }

    pub(crate) fn too_large(length: usize, max: usize) -> Self {
        ErrorKind::TooLarge { length, max }.into()
    }

    /// Re-labels a value construction error raised while resolving extended JSON.
    pub(crate) fn into_malformed_json(self) -> Self {
        match self.kind {
            ErrorKind::MalformedJson { .. } => self,
            kind => Self {
                kind: ErrorKind::MalformedJson {
                    message: kind.to_string(),
                    offset: None,
                },
                key: self.key,
            },
        }
    }

    /// Whether this error was caused by malformed BSON input.
    pub fn is_invalid_bson(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidBson { .. })
    }

    /// Whether this error was caused by malformed JSON input.
    pub fn is_malformed_json(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedJson { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_too_large(&self) -> bool {
        matches!(self.kind, ErrorKind::TooLarge { .. })
    }
}

/// Runs the provided closure, attaching `key` to any error it returns that does not already
/// carry a more specific key.
pub(crate) fn try_with_key<T, F: FnOnce() -> Result<T>>(key: &str, f: F) -> Result<T> {
    f().map_err(|e| e.with_key_if_absent(key))
}

#[cfg(test)]
mod test {
    use super::{Error, ErrorKind};

    #[test]
    fn display_includes_key() {
        let err = Error::invalid_bson("bad boolean").with_key("flag");
        assert_eq!(
            err.to_string(),
            "Error at key \"flag\": invalid BSON document: bad boolean"
        );
    }

    #[test]
    fn malformed_json_offset() {
        let err = Error::malformed_json_at("expected value", 7);
        assert_eq!(err.to_string(), "malformed JSON at offset 7: expected value");
        assert!(err.is_malformed_json());
    }

    #[test]
    fn innermost_key_wins() {
        let err = super::try_with_key::<(), _>("outer", || {
            super::try_with_key("inner", || Err(Error::invalid_bson("x")))
        })
        .unwrap_err();
        assert_eq!(err.key.as_deref(), Some("inner"));
    }

    #[test]
    fn construction_errors_relabel_as_json() {
        let err = Error::oid_invalid_length(3).into_malformed_json();
        assert!(matches!(err.kind, ErrorKind::MalformedJson { offset: None, .. }));
        assert!(err.to_string().contains("invalid hex string length 3"));
    }
}
