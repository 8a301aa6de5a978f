//! Module containing functionality related to BSON ObjectIds.
//! For more information, see the documentation for the [`ObjectId`] type.

use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// A wrapper around a raw 12-byte ObjectId.
///
/// ObjectIds are only ever read from input here, never generated, so the usual
/// timestamp/counter accessors are not provided.
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct ObjectId {
    id: [u8; 12],
}

impl ObjectId {
    /// Constructs a new ObjectId wrapper around the raw byte representation.
    pub const fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { id: bytes }
    }

    /// Constructs an ObjectId from the first 12 bytes of `bytes`, failing if fewer are available.
    pub(crate) fn from_slice(bytes: &[u8]) -> Result<ObjectId> {
        let id = bytes
            .get(0..12)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| Error::oid_invalid_byte_length(bytes.len()))?;
        Ok(Self::from_bytes(id))
    }

    /// Creates an ObjectId using a 12-byte (24-char) hexadecimal string.
    pub fn parse_str(s: impl AsRef<str>) -> Result<ObjectId> {
        let s = s.as_ref();

        let bytes: Vec<u8> = hex::decode(s.as_bytes()).map_err(|e| Error::from_hex_error(e, s.len()))?;
        if bytes.len() != 12 {
            Err(Error::oid_invalid_length(bytes.len() * 2))
        } else {
            let mut byte_array: [u8; 12] = [0; 12];
            byte_array[..].copy_from_slice(&bytes[..]);
            Ok(ObjectId::from_bytes(byte_array))
        }
    }

    /// Returns the raw byte representation of an ObjectId.
    pub const fn bytes(&self) -> [u8; 12] {
        self.id
    }

    /// Converts this ObjectId to its lowercase hex string representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.id)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.to_hex()).finish()
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use super::ObjectId;
    use crate::error::{ErrorKind, ObjectIdErrorKind};

    #[test]
    fn hex_round_trip() {
        let oid = ObjectId::parse_str("57E193D7A9CC81B4027498B5").unwrap();
        assert_eq!(
            oid.bytes(),
            [0x57, 0xe1, 0x93, 0xd7, 0xa9, 0xcc, 0x81, 0xb4, 0x02, 0x74, 0x98, 0xb5]
        );
        assert_eq!(oid.to_hex(), "57e193d7a9cc81b4027498b5");
        assert_eq!(format!("{:?}", oid), "ObjectId(\"57e193d7a9cc81b4027498b5\")");
    }

    #[test]
    fn bad_hex() {
        let err = ObjectId::parse_str("57e193d7a9cc81b4027498bz").unwrap_err();
        assert_matches!(
            err.kind,
            ErrorKind::ObjectId {
                kind: ObjectIdErrorKind::InvalidHexStringCharacter { c: 'z', index: 23 }
            }
        );

        let err = ObjectId::parse_str("57e193d7").unwrap_err();
        assert_matches!(
            err.kind,
            ErrorKind::ObjectId {
                kind: ObjectIdErrorKind::InvalidHexStringLength { length: 8 }
            }
        );

        let err = ObjectId::parse_str("57e").unwrap_err();
        assert_matches!(
            err.kind,
            ErrorKind::ObjectId {
                kind: ObjectIdErrorKind::InvalidHexStringLength { length: 3 }
            }
        );
    }

    #[test]
    fn from_short_slice() {
        let err = ObjectId::from_slice(&[1, 2, 3]).unwrap_err();
        assert_matches!(
            err.kind,
            ErrorKind::ObjectId {
                kind: ObjectIdErrorKind::InvalidByteLength { length: 3 }
            }
        );
        assert!(ObjectId::from_slice(&[0u8; 16]).is_ok());
    }
}
