//! The two conversions this crate exists for: BSON bytes to Extended JSON text ([`decode`]) and
//! Extended JSON text to BSON bytes ([`encode`]).
//!
//! ```rust
//! use bsonjs::{SerializationMode, decode, encode};
//!
//! let bson = encode(r#"{"a": {"$numberLong": "1"}}"#)?;
//! assert_eq!(decode(&bson, SerializationMode::Relaxed)?, r#"{"a": 1}"#);
//! assert_eq!(
//!     decode(&bson, SerializationMode::Canonical)?,
//!     r#"{"a": {"$numberLong": "1"}}"#
//! );
//! # Ok::<(), bsonjs::error::Error>(())
//! ```
//!
//! Every call is independent: the intermediate [`Document`](crate::Document) is built and dropped
//! within the call.

use std::io::{Read, Write};

use crate::{
    de::BsonReader,
    error::Result,
    extjson::{SerializationMode, de::JsonParser, ser::ExtendedJsonEncoder},
    ser::{BsonWriter, DEFAULT_MAX_DOCUMENT_SIZE},
};

/// Options used to configure a [`decode_with_options`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct DecoderOptions {
    /// The mode to render Extended JSON in. Defaults to [`SerializationMode::Relaxed`].
    pub mode: SerializationMode,

    /// Whether bytes after the first document are ignored. Defaults to `true`.
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            mode: SerializationMode::default(),
            allow_trailing_bytes: true,
        }
    }
}

impl DecoderOptions {
    /// Create a builder struct used to construct a [`DecoderOptions`].
    pub fn builder() -> DecoderOptionsBuilder {
        DecoderOptionsBuilder {
            options: Default::default(),
        }
    }
}

/// Builder used to create a [`DecoderOptions`].
#[derive(Debug, Clone)]
pub struct DecoderOptionsBuilder {
    options: DecoderOptions,
}

impl DecoderOptionsBuilder {
    /// Set the value for [`DecoderOptions::mode`].
    pub fn mode(mut self, mode: SerializationMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Set the value for [`DecoderOptions::allow_trailing_bytes`].
    pub fn allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.options.allow_trailing_bytes = allow;
        self
    }

    /// Consume this builder and produce a [`DecoderOptions`].
    pub fn build(self) -> DecoderOptions {
        self.options
    }
}

/// Options used to configure an [`encode_with_options`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct EncoderOptions {
    /// The largest document, in bytes, the encoder will produce. Defaults to `i32::MAX`.
    pub max_document_size: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

impl EncoderOptions {
    /// Create a builder struct used to construct an [`EncoderOptions`].
    pub fn builder() -> EncoderOptionsBuilder {
        EncoderOptionsBuilder {
            options: Default::default(),
        }
    }
}

/// Builder used to create an [`EncoderOptions`].
#[derive(Debug, Clone)]
pub struct EncoderOptionsBuilder {
    options: EncoderOptions,
}

impl EncoderOptionsBuilder {
    /// Set the value for [`EncoderOptions::max_document_size`].
    pub fn max_document_size(mut self, max: usize) -> Self {
        self.options.max_document_size = max;
        self
    }

    /// Consume this builder and produce an [`EncoderOptions`].
    pub fn build(self) -> EncoderOptions {
        self.options
    }
}

/// Converts the BSON document at the start of `bson` into Extended JSON text.
pub fn decode(bson: &[u8], mode: SerializationMode) -> Result<String> {
    decode_with_options(bson, &DecoderOptions::builder().mode(mode).build())
}

/// Converts the BSON document at the start of `bson` into Extended JSON text, using the given
/// options.
pub fn decode_with_options(bson: &[u8], options: &DecoderOptions) -> Result<String> {
    tracing::debug!(input_len = bson.len(), mode = ?options.mode, "decode");
    let result = reader(options)
        .read(bson)
        .and_then(|doc| ExtendedJsonEncoder::new(options.mode).encode(&doc));
    match &result {
        Ok(json) => tracing::debug!(output_len = json.len(), "decode: done"),
        Err(error) => tracing::debug!(%error, "decode"),
    }
    result
}

/// Converts the BSON document at the start of `bson` into Extended JSON text written to `writer`.
pub fn decode_to_writer<W: Write>(bson: &[u8], writer: W, mode: SerializationMode) -> Result<()> {
    tracing::debug!(input_len = bson.len(), ?mode, "decode_to_writer");
    let doc = BsonReader::new().read(bson).inspect_err(|error| {
        tracing::debug!(%error, "decode_to_writer");
    })?;
    ExtendedJsonEncoder::new(mode).encode_to_writer(&doc, writer)
}

fn reader(options: &DecoderOptions) -> BsonReader {
    BsonReader::new().allow_trailing_bytes(options.allow_trailing_bytes)
}

/// Converts Extended JSON (or plain JSON) text into a BSON document.
///
/// Only the first JSON value in `json` is read, and it must be an object.
pub fn encode(json: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    encode_with_options(json, &EncoderOptions::default())
}

/// Converts Extended JSON (or plain JSON) text into a BSON document, using the given options.
pub fn encode_with_options(json: impl AsRef<[u8]>, options: &EncoderOptions) -> Result<Vec<u8>> {
    let json = json.as_ref();
    tracing::debug!(input_len = json.len(), "encode");
    let result = JsonParser::parse_document(json)
        .and_then(|doc| BsonWriter::with_max_size(options.max_document_size).write(&doc));
    match &result {
        Ok(bson) => tracing::debug!(output_len = bson.len(), "encode: done"),
        Err(error) => tracing::debug!(%error, "encode"),
    }
    result
}

/// Reads all of `reader` and converts the Extended JSON text into a BSON document.
pub fn encode_from_reader<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut json = Vec::new();
    reader.read_to_end(&mut json)?;
    encode(json)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{
        DecoderOptions,
        EncoderOptions,
        decode,
        decode_to_writer,
        decode_with_options,
        encode,
        encode_from_reader,
        encode_with_options,
    };
    use crate::{SerializationMode, de::read_document, doc, ser::write_document};

    #[test]
    fn options_builders() {
        let options = DecoderOptions::builder()
            .mode(SerializationMode::Legacy)
            .allow_trailing_bytes(false)
            .build();
        assert_eq!(options.mode, SerializationMode::Legacy);
        assert!(!options.allow_trailing_bytes);
        assert_eq!(DecoderOptions::default().mode, SerializationMode::Relaxed);

        let options = EncoderOptions::builder().max_document_size(64).build();
        assert_eq!(options.max_document_size, 64);
    }

    #[test]
    fn decode_modes() {
        let bson = write_document(&doc! { "a": 1 }).unwrap();
        assert_eq!(decode(&bson, SerializationMode::Relaxed).unwrap(), r#"{"a": 1}"#);
        assert_eq!(
            decode(&bson, SerializationMode::Canonical).unwrap(),
            r#"{"a": {"$numberInt": "1"}}"#
        );
    }

    #[test]
    fn strict_trailing_bytes() {
        let mut bson = write_document(&doc! {}).unwrap();
        bson.push(0xff);
        assert_eq!(decode(&bson, SerializationMode::Relaxed).unwrap(), "{}");

        let options = DecoderOptions::builder().allow_trailing_bytes(false).build();
        assert!(decode_with_options(&bson, &options).unwrap_err().is_invalid_bson());
    }

    #[test]
    fn writer_and_reader_adapters() {
        let bson = encode_from_reader(&br#"{"x": "y"}"#[..]).unwrap();
        assert_eq!(read_document(&bson).unwrap(), doc! { "x": "y" });

        let mut out = Vec::new();
        decode_to_writer(&bson, &mut out, SerializationMode::Legacy).unwrap();
        assert_eq!(out, br#"{"x": "y"}"#);
    }

    #[test]
    fn encode_accepts_text_and_bytes() {
        let expected = write_document(&doc! { "a": true }).unwrap();
        assert_eq!(encode(r#"{"a": true}"#).unwrap(), expected);
        assert_eq!(encode(String::from(r#"{"a": true}"#)).unwrap(), expected);
        assert_eq!(encode(br#"{"a": true}"#.to_vec()).unwrap(), expected);
    }

    #[test]
    fn encode_size_limit() {
        let options = EncoderOptions::builder().max_document_size(8).build();
        assert!(encode_with_options(r#"{"a": 1}"#, &options)
            .unwrap_err()
            .is_too_large());
    }
}
