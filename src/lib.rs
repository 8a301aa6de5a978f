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

//! Conversion between [BSON](http://bsonspec.org/spec.html) documents and
//! [MongoDB Extended JSON](https://www.mongodb.com/docs/manual/reference/mongodb-extended-json/)
//! text.
//!
//! ## Basic usage
//!
//! ```rust
//! use bsonjs::{SerializationMode, decode, encode};
//!
//! let bson = encode(r#"{"hello": "world", "n": {"$numberLong": "42"}}"#)?;
//! let json = decode(&bson, SerializationMode::Canonical)?;
//! assert_eq!(json, r#"{"hello": "world", "n": {"$numberLong": "42"}}"#);
//!
//! // Relaxed mode drops the wrappers where plain JSON numbers suffice.
//! assert_eq!(
//!     decode(&bson, SerializationMode::Relaxed)?,
//!     r#"{"hello": "world", "n": 42}"#
//! );
//! # Ok::<(), bsonjs::error::Error>(())
//! ```
//!
//! ## Modes
//!
//! BSON has types JSON lacks, so the text form of a document depends on a [`SerializationMode`]:
//!
//! * [`SerializationMode::Canonical`] wraps every number and special type, so that the exact
//!   BSON type survives a round trip.
//! * [`SerializationMode::Relaxed`] (the default) writes numbers as bare JSON numbers and dates
//!   as ISO-8601 strings where possible.
//! * [`SerializationMode::Legacy`] reproduces the format used before Extended JSON 2.0.
//!
//! The encoder accepts all three spellings, and plain JSON, in the same input.
//!
//! ## Lower level access
//!
//! The conversion goes through an owned [`Document`]. [`de::BsonReader`] and [`ser::BsonWriter`]
//! move documents to and from bytes, [`raw`] validates bytes in place, and [`extjson`] moves
//! documents to and from text.

#![cfg_attr(docsrs, feature(doc_cfg))]

#[doc(inline)]
pub use self::{
    binary::Binary,
    bson::{Array, Bson, DbPointer, Document, JavaScriptCodeWithScope, Regex, Timestamp},
    codec::{
        DecoderOptions,
        EncoderOptions,
        decode,
        decode_to_writer,
        decode_with_options,
        encode,
        encode_from_reader,
        encode_with_options,
    },
    datetime::DateTime,
    decimal128::Decimal128,
    extjson::SerializationMode,
    oid::ObjectId,
};

#[macro_use]
mod macros;
mod binary;
mod bson;
pub mod codec;
mod datetime;
pub mod de;
mod decimal128;
mod document;
pub mod error;
pub mod extjson;
pub mod oid;
pub mod raw;
pub mod ser;
pub mod spec;
