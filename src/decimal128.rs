//! [BSON Decimal128](https://github.com/mongodb/specifications/blob/master/source/bson-decimal128/decimal128.md) data type representation

use std::{fmt, str::FromStr};

use bitvec::prelude::*;

use crate::error::{Decimal128ErrorKind, Error, Result};

/// Struct representing a BSON Decimal128 type.
///
/// This type supports conversion to and from human-readable strings via the [std::fmt::Display]
/// and [std::str::FromStr] traits:
///
/// ```rust
/// # use std::str::FromStr;
/// # use bsonjs::Decimal128;
/// # fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
/// let value: Decimal128 = "3.14159".parse()?;
/// assert_eq!("3.14159", format!("{}", value));
/// let scientific = Decimal128::from_str("1.05E+3")?;
/// assert_eq!("1.05E+3", scientific.to_string());
/// # Ok(())
/// # }
/// # example().unwrap()
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq)]
pub struct Decimal128 {
    /// BSON bytes containing the decimal128. Stored for round tripping.
    pub(crate) bytes: [u8; 16],
}

impl Decimal128 {
    /// Constructs a new `Decimal128` from the provided raw byte representation.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Returns the raw byte representation of this `Decimal128`.
    pub const fn bytes(&self) -> [u8; 16] {
        self.bytes
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128({})", hex::encode(self.bytes))
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ParsedDecimal128::new(self))
    }
}

impl FromStr for Decimal128 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(s.parse::<ParsedDecimal128>()?.pack())
    }
}

type Order = Msb0;

const EXPONENT_BIAS: i32 = 6176;
const EXPONENT_MIN: i32 = -EXPONENT_BIAS;
const EXPONENT_MAX: i32 = 6111;
const MAX_DIGITS: usize = 34;

/// Bit ranges within the big-endian view of the 128 bits.
const COMBINATION: std::ops::Range<usize> = 1..6;
const EXPONENT: std::ops::Range<usize> = 1..15;
const EXPONENT_NONCANONICAL: std::ops::Range<usize> = 3..17;
const COEFFICIENT: std::ops::Range<usize> = 15..128;

#[derive(Debug, Clone, PartialEq)]
struct ParsedDecimal128 {
    sign: bool,
    kind: Decimal128Kind,
}

#[derive(Debug, Clone, PartialEq)]
enum Decimal128Kind {
    NaN { signalling: bool },
    Infinity,
    Finite { exponent: i32, coefficient: u128 },
}

impl ParsedDecimal128 {
    fn new(source: &Decimal128) -> Self {
        // BSON byte order is the opposite of the decimal128 spec byte order.
        let mut be = source.bytes;
        be.reverse();
        let bits = be.view_bits::<Order>();

        let sign = bits[0];
        let kind = if bits[COMBINATION.start..COMBINATION.end - 1].all() {
            if bits[COMBINATION.end - 1] {
                Decimal128Kind::NaN {
                    signalling: bits[COMBINATION.end],
                }
            } else {
                Decimal128Kind::Infinity
            }
        } else if bits[1] && bits[2] {
            // The implied `100` coefficient prefix always exceeds the maximum of 34 nines, so
            // the coefficient is non-canonical and reads as zero.
            Decimal128Kind::Finite {
                exponent: bits[EXPONENT_NONCANONICAL].load_be::<u16>() as i32 - EXPONENT_BIAS,
                coefficient: 0,
            }
        } else {
            let coefficient = bits[COEFFICIENT].load_be::<u128>();
            Decimal128Kind::Finite {
                exponent: bits[EXPONENT].load_be::<u16>() as i32 - EXPONENT_BIAS,
                coefficient: if coefficient > max_coefficient() {
                    0
                } else {
                    coefficient
                },
            }
        };
        ParsedDecimal128 { sign, kind }
    }

    fn pack(&self) -> Decimal128 {
        let mut be = [0u8; 16];
        let bits = be.view_bits_mut::<Order>();
        bits.set(0, self.sign);

        match self.kind {
            Decimal128Kind::NaN { signalling } => {
                bits[COMBINATION].fill(true);
                bits.set(COMBINATION.end, signalling);
            }
            Decimal128Kind::Infinity => {
                bits[COMBINATION.start..COMBINATION.end - 1].fill(true);
            }
            Decimal128Kind::Finite {
                exponent,
                coefficient,
            } => {
                bits[EXPONENT].store_be::<u16>((exponent + EXPONENT_BIAS) as u16);
                bits[COEFFICIENT].store_be::<u128>(coefficient);
            }
        }

        be.reverse();
        Decimal128::from_bytes(be)
    }
}

fn max_coefficient() -> u128 {
    10u128.pow(MAX_DIGITS as u32) - 1
}

impl fmt::Display for ParsedDecimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (exponent, coefficient) = match self.kind {
            Decimal128Kind::NaN { .. } => return f.write_str("NaN"),
            Decimal128Kind::Infinity => {
                return f.write_str(if self.sign { "-Infinity" } else { "Infinity" });
            }
            Decimal128Kind::Finite {
                exponent,
                coefficient,
            } => (exponent, coefficient),
        };

        if self.sign {
            f.write_str("-")?;
        }

        let digits = coefficient.to_string();
        let adjusted = exponent + digits.len() as i32 - 1;

        if exponent <= 0 && adjusted >= -6 {
            if exponent == 0 {
                return f.write_str(&digits);
            }
            let scale = (-exponent) as usize;
            if digits.len() > scale {
                let (int, frac) = digits.split_at(digits.len() - scale);
                write!(f, "{int}.{frac}")
            } else {
                write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            write!(f, "E{adjusted:+}")
        }
    }
}

impl FromStr for ParsedDecimal128 {
    type Err = Error;

    fn from_str(mut s: &str) -> Result<Self> {
        let sign = if let Some(rest) = s.strip_prefix('-') {
            s = rest;
            true
        } else {
            if let Some(rest) = s.strip_prefix('+') {
                s = rest;
            }
            false
        };

        if s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinity") {
            return Ok(ParsedDecimal128 {
                sign,
                kind: Decimal128Kind::Infinity,
            });
        }
        if s.eq_ignore_ascii_case("nan") {
            return Ok(ParsedDecimal128 {
                sign,
                kind: Decimal128Kind::NaN { signalling: false },
            });
        }

        let (mantissa, exp_str) = match s.find(['e', 'E']) {
            Some(ix) => (&s[..ix], Some(&s[ix + 1..])),
            None => (s, None),
        };

        let mut exponent: i32 = match exp_str {
            None => 0,
            Some("") => return Err(Error::decimal128(Decimal128ErrorKind::EmptyExponent)),
            Some(e) => e.parse().map_err(|e: std::num::ParseIntError| {
                Error::decimal128(Decimal128ErrorKind::InvalidExponent {
                    message: e.to_string(),
                })
            })?,
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::decimal128(Decimal128ErrorKind::Unparseable));
        }
        if let Some(c) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(Error::decimal128(Decimal128ErrorKind::InvalidCoefficient {
                message: format!("unexpected character {c:?}"),
            }));
        }

        exponent = exponent
            .checked_sub(frac_part.len() as i32)
            .ok_or_else(|| Error::decimal128(Decimal128ErrorKind::Underflow))?;

        let mut digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .skip_while(|&b| b == b'0')
            .map(|b| b - b'0')
            .collect();
        let is_zero = digits.is_empty();

        // Drop trailing zeros that cannot fit; anything else would need rounding.
        while digits.len() > MAX_DIGITS {
            if digits.last() != Some(&0) {
                return Err(Error::decimal128(Decimal128ErrorKind::InexactRounding));
            }
            digits.pop();
            exponent = exponent.saturating_add(1);
        }

        if is_zero {
            exponent = exponent.clamp(EXPONENT_MIN, EXPONENT_MAX);
        }

        while exponent > EXPONENT_MAX {
            if digits.len() == MAX_DIGITS {
                return Err(Error::decimal128(Decimal128ErrorKind::Overflow));
            }
            digits.push(0);
            exponent -= 1;
        }

        while exponent < EXPONENT_MIN {
            if digits.last() != Some(&0) {
                return Err(Error::decimal128(Decimal128ErrorKind::Underflow));
            }
            digits.pop();
            exponent += 1;
        }

        let coefficient = digits
            .iter()
            .fold(0u128, |acc, &d| acc * 10 + u128::from(d));

        Ok(ParsedDecimal128 {
            sign,
            kind: Decimal128Kind::Finite {
                exponent,
                coefficient,
            },
        })
    }
}
