// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Typed keyword values
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extended-header keywords carry a single type character followed by the raw
// value bytes. Numeric values use the header byte order; ASCII values are
// stored without a terminator.

use crate::error::{BlueError, BlueResult};
use crate::repr::ByteOrder;

/// ASCII keyword values must be shorter than this many characters.
pub const MAX_ASCII_KEYWORD_LEN: usize = 80;

/// A typed extended-header value.
#[derive(Debug, Clone, PartialEq)]
pub enum BlueValue {
    /// Signed byte (`B`).
    Byte(i8),
    /// Unsigned byte (`O`).
    Octet(u8),
    /// 16-bit integer (`I`).
    Int(i16),
    /// 32-bit integer (`L`).
    Long(i32),
    /// 64-bit integer (`X`).
    Xlong(i64),
    /// 32-bit float (`F`).
    Float(f32),
    /// 64-bit float (`D`).
    Double(f64),
    /// ASCII text (`A`).
    Ascii(String),
}

impl BlueValue {
    /// Build an ASCII value, rejecting text the format cannot carry.
    pub fn ascii(text: impl Into<String>) -> BlueResult<Self> {
        let text = text.into();
        if !text.is_ascii() {
            return Err(BlueError::NonAsciiKeyword(text));
        }
        let len = text.len();
        if len == 0 || len >= MAX_ASCII_KEYWORD_LEN {
            return Err(BlueError::UnstorableAscii {
                len,
                max: MAX_ASCII_KEYWORD_LEN,
            });
        }
        Ok(Self::Ascii(text))
    }

    /// The single character type code.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Byte(_) => b'B',
            Self::Octet(_) => b'O',
            Self::Int(_) => b'I',
            Self::Long(_) => b'L',
            Self::Xlong(_) => b'X',
            Self::Float(_) => b'F',
            Self::Double(_) => b'D',
            Self::Ascii(_) => b'A',
        }
    }

    /// Encode the value bytes in the given order.
    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        macro_rules! ordered {
            ($v:expr) => {
                match order {
                    ByteOrder::Ieee => $v.to_be_bytes().to_vec(),
                    ByteOrder::Eeei => $v.to_le_bytes().to_vec(),
                }
            };
        }
        match self {
            Self::Byte(v) => vec![*v as u8],
            Self::Octet(v) => vec![*v],
            Self::Int(v) => ordered!(v),
            Self::Long(v) => ordered!(v),
            Self::Xlong(v) => ordered!(v),
            Self::Float(v) => ordered!(v),
            Self::Double(v) => ordered!(v),
            Self::Ascii(s) => s.as_bytes().to_vec(),
        }
    }

    /// Decode value bytes of the given type.
    ///
    /// Numeric types read the first element only; arrays are not produced
    /// by this codec.
    pub fn decode(type_code: u8, data: &[u8], order: ByteOrder) -> BlueResult<Self> {
        macro_rules! ordered {
            ($ty:ty, $variant:ident) => {{
                const WIDTH: usize = std::mem::size_of::<$ty>();
                let raw: [u8; WIDTH] = data
                    .get(..WIDTH)
                    .and_then(|slice| slice.try_into().ok())
                    .ok_or(BlueError::UnexpectedEof(data.len()))?;
                Self::$variant(match order {
                    ByteOrder::Ieee => <$ty>::from_be_bytes(raw),
                    ByteOrder::Eeei => <$ty>::from_le_bytes(raw),
                })
            }};
        }
        let first = || data.first().copied().ok_or(BlueError::UnexpectedEof(0));
        Ok(match type_code {
            b'B' => Self::Byte(first()? as i8),
            b'O' => Self::Octet(first()?),
            b'I' => ordered!(i16, Int),
            b'L' => ordered!(i32, Long),
            b'X' => ordered!(i64, Xlong),
            b'F' => ordered!(f32, Float),
            b'D' => ordered!(f64, Double),
            b'A' => Self::Ascii(String::from_utf8(data.to_vec())?),
            other => return Err(BlueError::InvalidKeywordType(other)),
        })
    }
}

/// Index descriptor attached to an "index" keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordIndex {
    pub value: BlueValue,
    pub units: Option<i16>,
}

/// One named extended-header keyword with its optional companions.
///
/// Packing emits the keyword itself, then `NAME.UNITS` when units are set,
/// then `NAME.INDEX` and `NAME.INDEX_UNITS` for index keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueKeyword {
    pub name: String,
    pub value: BlueValue,
    pub units: Option<i16>,
    pub index: Option<KeywordIndex>,
}

impl BlueKeyword {
    pub fn new(name: impl Into<String>, value: BlueValue) -> Self {
        Self {
            name: name.into(),
            value,
            units: None,
            index: None,
        }
    }

    pub fn with_units(mut self, units: i16) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_index(mut self, value: BlueValue, units: Option<i16>) -> Self {
        self.index = Some(KeywordIndex { value, units });
        self
    }

    /// Flatten into the (name, value) entries written to the region.
    pub(crate) fn entries(&self) -> Vec<(String, BlueValue)> {
        let mut out = vec![(self.name.clone(), self.value.clone())];
        if let Some(units) = self.units {
            out.push((format!("{}.UNITS", self.name), BlueValue::Int(units)));
        }
        if let Some(index) = &self.index {
            out.push((format!("{}.INDEX", self.name), index.value.clone()));
            if let Some(units) = index.units {
                out.push((format!("{}.INDEX_UNITS", self.name), BlueValue::Int(units)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_limits() {
        assert!(BlueValue::ascii("").is_err());
        assert!(BlueValue::ascii("x".repeat(79)).is_ok());
        assert!(matches!(
            BlueValue::ascii("x".repeat(80)),
            Err(BlueError::UnstorableAscii { len: 80, .. })
        ));
    }

    #[test]
    fn test_ascii_rejects_multibyte_text() {
        // 79 characters but 158 bytes.
        assert!(matches!(
            BlueValue::ascii("é".repeat(79)),
            Err(BlueError::NonAsciiKeyword(_))
        ));
        assert!(matches!(
            BlueValue::ascii("é"),
            Err(BlueError::NonAsciiKeyword(_))
        ));
    }

    #[test]
    fn test_encode_decode_numeric() {
        let value = BlueValue::Long(-123_456);
        let bytes = value.encode(ByteOrder::Ieee);
        assert_eq!(bytes, (-123_456i32).to_be_bytes());
        assert_eq!(BlueValue::decode(b'L', &bytes, ByteOrder::Ieee).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(matches!(
            BlueValue::decode(b'Q', &[0; 8], ByteOrder::Ieee),
            Err(BlueError::InvalidKeywordType(b'Q'))
        ));
    }

    #[test]
    fn test_keyword_companion_entries() {
        let keyword = BlueKeyword::new("COL_RF", BlueValue::Double(1.0e9))
            .with_units(3)
            .with_index(BlueValue::Long(2), Some(1));
        let names: Vec<String> = keyword.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["COL_RF", "COL_RF.UNITS", "COL_RF.INDEX", "COL_RF.INDEX_UNITS"]
        );
    }
}
