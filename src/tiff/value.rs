//! Typed TIFF tag values decoded from raw entry bytes.

use std::fmt;

use super::{
    Endian, TYPE_ASCII, TYPE_BYTE, TYPE_LONG, TYPE_RATIONAL, TYPE_SHORT, TYPE_SLONG,
    TYPE_SRATIONAL, TYPE_SSHORT, TYPE_UNDEFINED,
};

/// Unsigned rational: numerator / denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Signed rational: numerator / denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SRational {
    pub num: i32,
    pub den: i32,
}

impl fmt::Display for SRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// A decoded tag value.
///
/// Unknown type codes are preserved as raw bytes so a rewrite can carry
/// them through without understanding them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(Vec<u8>),
    /// ASCII text with trailing NULs stripped, decoded lossily.
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    Undefined(Vec<u8>),
    Unknown(u16, Vec<u8>),
}

impl Value {
    /// Decode raw entry bytes according to the declared type. The raw
    /// slice is already bounds-checked to `count * type_size` bytes.
    pub(crate) fn decode(type_code: u16, raw: &[u8], endian: Endian) -> Value {
        match type_code {
            TYPE_BYTE => Value::Byte(raw.to_vec()),
            TYPE_ASCII => {
                let text = raw.split(|&b| b == 0).next().unwrap_or(&[]);
                Value::Ascii(String::from_utf8_lossy(text).into_owned())
            }
            TYPE_SHORT => Value::Short(
                raw.chunks_exact(2)
                    .map(|c| endian.read_u16(c, 0).unwrap_or_default())
                    .collect(),
            ),
            TYPE_LONG => Value::Long(
                raw.chunks_exact(4)
                    .map(|c| endian.read_u32(c, 0).unwrap_or_default())
                    .collect(),
            ),
            TYPE_RATIONAL => Value::Rational(
                raw.chunks_exact(8)
                    .map(|c| Rational {
                        num: endian.read_u32(c, 0).unwrap_or_default(),
                        den: endian.read_u32(c, 4).unwrap_or_default(),
                    })
                    .collect(),
            ),
            TYPE_SSHORT => Value::SShort(
                raw.chunks_exact(2)
                    .map(|c| endian.read_u16(c, 0).unwrap_or_default() as i16)
                    .collect(),
            ),
            TYPE_SLONG => Value::SLong(
                raw.chunks_exact(4)
                    .map(|c| endian.read_u32(c, 0).unwrap_or_default() as i32)
                    .collect(),
            ),
            TYPE_SRATIONAL => Value::SRational(
                raw.chunks_exact(8)
                    .map(|c| SRational {
                        num: endian.read_u32(c, 0).unwrap_or_default() as i32,
                        den: endian.read_u32(c, 4).unwrap_or_default() as i32,
                    })
                    .collect(),
            ),
            TYPE_UNDEFINED => Value::Undefined(raw.to_vec()),
            other => Value::Unknown(other, raw.to_vec()),
        }
    }

    /// First element as an unsigned integer; `None` when the declared type
    /// is not an integer type or the value is empty or negative.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Byte(v) => v.first().map(|&b| u32::from(b)),
            Value::Short(v) => v.first().map(|&s| u32::from(s)),
            Value::Long(v) => v.first().copied(),
            Value::SShort(v) => v.first().and_then(|&s| u32::try_from(s).ok()),
            Value::SLong(v) => v.first().and_then(|&s| u32::try_from(s).ok()),
            _ => None,
        }
    }

    /// The text of an ASCII value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value for a string-typed metadata field: ASCII text is
    /// trimmed, numeric values are stringified. `None` means the value has
    /// no sensible string form (undefined/unknown payloads).
    pub fn to_display(&self) -> Option<String> {
        fn join<T: fmt::Display>(items: &[T]) -> Option<String> {
            match items {
                [] => None,
                [only] => Some(only.to_string()),
                many => Some(
                    many.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" "),
                ),
            }
        }
        match self {
            Value::Ascii(s) => Some(s.trim().to_owned()),
            Value::Byte(v) => join(v),
            Value::Short(v) => join(v),
            Value::Long(v) => join(v),
            Value::Rational(v) => join(v),
            Value::SShort(v) => join(v),
            Value::SLong(v) => join(v),
            Value::SRational(v) => join(v),
            Value::Undefined(_) | Value::Unknown(..) => None,
        }
    }
}
