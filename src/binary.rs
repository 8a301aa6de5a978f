use std::fmt::{self, Display};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    error::{Error, Result},
    spec::BinarySubtype,
};

/// Represents a BSON binary value.
///
/// For [`BinarySubtype::BinaryOld`] values, `bytes` holds only the payload; the inner length
/// prefix used on the wire is added and stripped by the writer and reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    /// The subtype of the bytes.
    pub subtype: BinarySubtype,

    /// The binary bytes.
    pub bytes: Vec<u8>,
}

impl Display for Binary {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Binary({:#x}, {})",
            u8::from(self.subtype),
            self.to_base64()
        )
    }
}

impl Binary {
    /// Creates a [`Binary`] from a base64 string and optional [`BinarySubtype`]. If the
    /// `subtype` argument is [`None`], the [`Binary`] constructed will default to
    /// [`BinarySubtype::Generic`].
    ///
    /// ```rust
    /// # use bsonjs::{Binary, spec::BinarySubtype};
    /// let binary = Binary::from_base64("aGVsbG8=", None)?;
    /// assert_eq!(binary.bytes, b"hello");
    /// assert_eq!(binary.subtype, BinarySubtype::Generic);
    /// # Ok::<(), bsonjs::error::Error>(())
    /// ```
    pub fn from_base64(
        input: impl AsRef<str>,
        subtype: impl Into<Option<BinarySubtype>>,
    ) -> Result<Self> {
        let input = input.as_ref();
        let bytes = STANDARD
            .decode(input)
            .map_err(|e| Error::malformed_json(format!("invalid base64 {input:?}: {e}")))?;
        let subtype = subtype.into().unwrap_or(BinarySubtype::Generic);
        Ok(Binary { subtype, bytes })
    }

    /// The bytes encoded with the standard, padded base64 alphabet.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// The subtype as a two digit lowercase hex string, e.g. `"04"`.
    pub(crate) fn subtype_hex(&self) -> String {
        format!("{:02x}", self.subtype)
    }
}

/// Parses a subtype written as one or two hex digits, e.g. `"0"`, `"04"` or `"80"`.
pub(crate) fn parse_subtype_hex(s: &str) -> Result<BinarySubtype> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::malformed_json(format!(
            "binary subtype must be one or two hex digits, got {s:?}"
        )));
    }
    u8::from_str_radix(s, 16)
        .map(BinarySubtype::from)
        .map_err(|e| Error::malformed_json(format!("invalid binary subtype {s:?}: {e}")))
}

#[cfg(test)]
mod test {
    use super::{Binary, parse_subtype_hex};
    use crate::spec::BinarySubtype;

    #[test]
    fn base64_round_trip() {
        let binary = Binary {
            subtype: BinarySubtype::UserDefined(0x80),
            bytes: b"//8=".to_vec(),
        };
        let encoded = binary.to_base64();
        assert_eq!(encoded, "Ly84PQ==");
        let decoded = Binary::from_base64(&encoded, binary.subtype).unwrap();
        assert_eq!(decoded, binary);
        assert_eq!(decoded.subtype_hex(), "80");
        assert_eq!(decoded.to_string(), "Binary(0x80, Ly84PQ==)");
    }

    #[test]
    fn bad_base64() {
        assert!(Binary::from_base64("not base64!", None).unwrap_err().is_malformed_json());
    }

    #[test]
    fn subtype_parsing() {
        assert_eq!(parse_subtype_hex("0").unwrap(), BinarySubtype::Generic);
        assert_eq!(parse_subtype_hex("04").unwrap(), BinarySubtype::Uuid);
        assert_eq!(parse_subtype_hex("Ff").unwrap(), BinarySubtype::UserDefined(0xff));
        assert!(parse_subtype_hex("").is_err());
        assert!(parse_subtype_hex("100").is_err());
        assert!(parse_subtype_hex("zz").is_err());
        assert!(parse_subtype_hex("+1").is_err());
    }
}
