// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Header control block
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The header control block (HCB) is the fixed 512-byte structure at the
// start of every BLUE file. Numeric fields use the byte order named by
// `head_rep` at offset 4.
//
//   off  field                         off  field
//   0    version "BLUE"                64   inlet (i16)
//   4    head_rep                      66   outlets (i16)
//   8    data_rep                      68   outmask (i32)
//   12   detached (i32)                72   pipeloc (i32)
//   16   protected (i32)               76   pipesize (i32)
//   20   pipe (i32)                    80   in_byte (f64)
//   24   ext_start (i32, blocks)       88   out_byte (f64)
//   28   ext_size (i32, bytes)         96   outbytes (8 x f64)
//   32   data_start (f64)              160  keylength (i32)
//   40   data_size (f64)               164  keywords (92 bytes)
//   48   type (i32)                    256  adjunct (256 bytes)
//   52   format (2 chars)
//   54   flagmask (i16)
//   56   timecode (f64)
//
// Type 1000 adjunct: xstart f64 @256, xdelta f64 @264, xunits i32 @272.
// Type 2000 adds subsize i32 @276, ystart f64 @280, ydelta f64 @288 and
// yunits i32 @296.

use tracing::warn;

use crate::error::{BlueError, BlueResult};
use crate::format::FormatCode;
use crate::repr::{ByteOrder, FieldReader, FieldWriter};
use crate::BLOCK_SIZE;

/// Size of the main-header keyword area.
pub const MAIN_KEYWORDS_LEN: usize = 92;

const VERSION: &[u8; 4] = b"BLUE";
const TYPE_1D: i32 = 1000;
const TYPE_2D: i32 = 2000;

mod offset {
    pub const VERSION: usize = 0;
    pub const HEAD_REP: usize = 4;
    pub const DATA_REP: usize = 8;
    pub const DETACHED: usize = 12;
    pub const PROTECTED: usize = 16;
    pub const PIPE: usize = 20;
    pub const EXT_START: usize = 24;
    pub const EXT_SIZE: usize = 28;
    pub const DATA_START: usize = 32;
    pub const DATA_SIZE: usize = 40;
    pub const TYPE: usize = 48;
    pub const FORMAT: usize = 52;
    pub const FLAGMASK: usize = 54;
    pub const TIMECODE: usize = 56;
    pub const IN_BYTE: usize = 80;
    pub const OUT_BYTE: usize = 88;
    pub const KEYLENGTH: usize = 160;
    pub const KEYWORDS: usize = 164;
    pub const XSTART: usize = 256;
    pub const XDELTA: usize = 264;
    pub const XUNITS: usize = 272;
    pub const SUBSIZE: usize = 276;
    pub const YSTART: usize = 280;
    pub const YDELTA: usize = 288;
    pub const YUNITS: usize = 296;
}

// ---------------------------------------------------------------------------
// Adjunct
// ---------------------------------------------------------------------------

/// Start, spacing and units of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axis {
    pub start: f64,
    pub delta: f64,
    pub units: i32,
}

/// Type-specific trailing block of the HCB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjunct {
    /// Type 1000: a single abscissa.
    OneD { x: Axis },
    /// Type 2000: frames of `subsize` columns.
    TwoD { x: Axis, subsize: i32, y: Axis },
}

impl Adjunct {
    pub fn type_code(&self) -> i32 {
        match self {
            Self::OneD { .. } => TYPE_1D,
            Self::TwoD { .. } => TYPE_2D,
        }
    }

    pub fn x(&self) -> &Axis {
        match self {
            Self::OneD { x } | Self::TwoD { x, .. } => x,
        }
    }
}

// ---------------------------------------------------------------------------
// HeaderControlBlock
// ---------------------------------------------------------------------------

/// The decoded fixed header of a BLUE file.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderControlBlock {
    pub head_rep: ByteOrder,
    pub data_rep: ByteOrder,
    pub detached: i32,
    pub protected: i32,
    /// First block of the extended header.
    pub ext_start: i32,
    /// Length of the extended header in bytes, including padding.
    pub ext_size: i32,
    pub data_start: f64,
    /// Exact byte count of the data region.
    pub data_size: f64,
    pub format: FormatCode,
    pub flagmask: i16,
    /// Seconds since J1950.
    pub timecode: f64,
    /// `NAME=VALUE` pairs stored in the 92-byte main keyword area.
    pub keywords: Vec<(String, String)>,
    pub adjunct: Adjunct,
}

impl HeaderControlBlock {
    /// A header for data starting right after the HCB.
    pub fn new(format: FormatCode, adjunct: Adjunct) -> Self {
        Self {
            head_rep: ByteOrder::Ieee,
            data_rep: ByteOrder::native(),
            detached: 0,
            protected: 0,
            ext_start: 0,
            ext_size: 0,
            data_start: BLOCK_SIZE as f64,
            data_size: 0.0,
            format,
            flagmask: 0,
            timecode: 0.0,
            keywords: Vec::new(),
            adjunct,
        }
    }

    pub fn type_code(&self) -> i32 {
        self.adjunct.type_code()
    }

    /// Byte offset just past the last data byte.
    pub fn data_end(&self) -> u64 {
        (self.data_start + self.data_size).max(0.0) as u64
    }

    /// Look up a main-header keyword.
    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn packed_keywords(&self) -> BlueResult<Vec<u8>> {
        let mut packed = Vec::new();
        for (key, value) in &self.keywords {
            packed.extend_from_slice(key.as_bytes());
            packed.push(b'=');
            packed.extend_from_slice(value.as_bytes());
            packed.push(0);
        }
        if packed.len() > MAIN_KEYWORDS_LEN {
            return Err(BlueError::MainKeywordsOverflow {
                needed: packed.len(),
                available: MAIN_KEYWORDS_LEN,
            });
        }
        Ok(packed)
    }

    /// Encode into the 512-byte on-disk form.
    pub fn encode(&self) -> BlueResult<[u8; BLOCK_SIZE]> {
        let keywords = self.packed_keywords()?;
        let mut buf = [0u8; BLOCK_SIZE];
        let mut w = FieldWriter::new(&mut buf, self.head_rep);

        w.put_bytes(offset::VERSION, VERSION);
        w.put_bytes(offset::HEAD_REP, self.head_rep.tag());
        w.put_bytes(offset::DATA_REP, self.data_rep.tag());
        w.put_i32(offset::DETACHED, self.detached);
        w.put_i32(offset::PROTECTED, self.protected);
        w.put_i32(offset::PIPE, 0);
        w.put_i32(offset::EXT_START, self.ext_start);
        w.put_i32(offset::EXT_SIZE, self.ext_size);
        w.put_f64(offset::DATA_START, self.data_start);
        w.put_f64(offset::DATA_SIZE, self.data_size);
        w.put_i32(offset::TYPE, self.type_code());
        w.put_bytes(offset::FORMAT, &self.format.to_bytes());
        w.put_i16(offset::FLAGMASK, self.flagmask);
        w.put_f64(offset::TIMECODE, self.timecode);
        w.put_f64(offset::IN_BYTE, 0.0);
        w.put_f64(offset::OUT_BYTE, 0.0);
        w.put_i32(offset::KEYLENGTH, keywords.len() as i32);
        w.put_bytes(offset::KEYWORDS, &keywords);

        let x = self.adjunct.x();
        w.put_f64(offset::XSTART, x.start);
        w.put_f64(offset::XDELTA, x.delta);
        w.put_i32(offset::XUNITS, x.units);
        if let Adjunct::TwoD { subsize, y, .. } = &self.adjunct {
            w.put_i32(offset::SUBSIZE, *subsize);
            w.put_f64(offset::YSTART, y.start);
            w.put_f64(offset::YDELTA, y.delta);
            w.put_i32(offset::YUNITS, y.units);
        }
        Ok(buf)
    }

    /// Decode a header from at least 512 bytes.
    pub fn decode(bytes: &[u8]) -> BlueResult<Self> {
        if bytes.len() < BLOCK_SIZE {
            return Err(BlueError::UnexpectedEof(bytes.len()));
        }
        if &bytes[offset::VERSION..offset::VERSION + 4] != VERSION {
            return Err(BlueError::BadVersion(
                String::from_utf8_lossy(&bytes[0..4]).into_owned(),
            ));
        }
        let head_rep = ByteOrder::from_tag(&bytes[offset::HEAD_REP..offset::HEAD_REP + 4])?;
        let data_rep = ByteOrder::from_tag(&bytes[offset::DATA_REP..offset::DATA_REP + 4])?;
        let r = FieldReader::new(bytes, head_rep);

        let format = FormatCode::from_bytes([bytes[offset::FORMAT], bytes[offset::FORMAT + 1]])?;

        let keylength = (r.get_i32(offset::KEYLENGTH)?.max(0) as usize).min(MAIN_KEYWORDS_LEN);
        let keywords = r
            .get_bytes(offset::KEYWORDS, keylength)?
            .split(|b| *b == 0)
            .filter(|chunk| !chunk.is_empty())
            .filter_map(|chunk| {
                let text = String::from_utf8_lossy(chunk);
                text.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect();

        let x = Axis {
            start: r.get_f64(offset::XSTART)?,
            delta: r.get_f64(offset::XDELTA)?,
            units: r.get_i32(offset::XUNITS)?,
        };
        let adjunct = match r.get_i32(offset::TYPE)? {
            TYPE_1D => Adjunct::OneD { x },
            TYPE_2D => Adjunct::TwoD {
                x,
                subsize: r.get_i32(offset::SUBSIZE)?,
                y: Axis {
                    start: r.get_f64(offset::YSTART)?,
                    delta: r.get_f64(offset::YDELTA)?,
                    units: r.get_i32(offset::YUNITS)?,
                },
            },
            other => return Err(BlueError::UnsupportedType(other)),
        };

        Ok(Self {
            head_rep,
            data_rep,
            detached: r.get_i32(offset::DETACHED)?,
            protected: r.get_i32(offset::PROTECTED)?,
            ext_start: r.get_i32(offset::EXT_START)?,
            ext_size: r.get_i32(offset::EXT_SIZE)?,
            data_start: r.get_f64(offset::DATA_START)?,
            data_size: r.get_f64(offset::DATA_SIZE)?,
            format,
            flagmask: r.get_i16(offset::FLAGMASK)?,
            timecode: r.get_f64(offset::TIMECODE)?,
            keywords,
            adjunct,
        })
    }

    /// Check the decoded fields for internal consistency.
    pub fn validate(&self) -> BlueResult<()> {
        let fail = |reason: String| {
            warn!(reason = %reason, "BLUE header failed validation");
            Err(BlueError::Invalid(reason))
        };
        if !(self.data_start.is_finite() && self.data_start >= 0.0) {
            return fail(format!("data_start {} out of range", self.data_start));
        }
        if !(self.data_size.is_finite() && self.data_size >= 0.0) {
            return fail(format!("data_size {} out of range", self.data_size));
        }
        if self.ext_start < 0 || self.ext_size < 0 {
            return fail(format!(
                "negative extended header placement ({}, {})",
                self.ext_start, self.ext_size
            ));
        }
        if self.ext_size > 0 && (self.ext_start as u64 * BLOCK_SIZE as u64) < self.data_end() {
            return fail(format!(
                "extended header block {} overlaps data ending at {}",
                self.ext_start,
                self.data_end()
            ));
        }
        if let Adjunct::TwoD { subsize, .. } = self.adjunct {
            if subsize <= 0 {
                return fail(format!("type 2000 header with subsize {subsize}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{DataMode, ElementFormat};

    fn one_d() -> HeaderControlBlock {
        let mut hcb = HeaderControlBlock::new(
            FormatCode::new(DataMode::Scalar, ElementFormat::Int),
            Adjunct::OneD {
                x: Axis {
                    start: 0.5,
                    delta: 1e-3,
                    units: 1,
                },
            },
        );
        hcb.data_size = 200.0;
        hcb.timecode = 631_152_010.25;
        hcb
    }

    #[test]
    fn test_encode_places_fields() {
        let bytes = one_d().encode().unwrap();
        assert_eq!(&bytes[0..4], b"BLUE");
        assert_eq!(&bytes[4..8], b"IEEE");
        assert_eq!(&bytes[52..54], b"SI");
        assert_eq!(i32::from_be_bytes(bytes[48..52].try_into().unwrap()), 1000);
        assert_eq!(f64::from_be_bytes(bytes[32..40].try_into().unwrap()), 512.0);
        assert_eq!(f64::from_be_bytes(bytes[264..272].try_into().unwrap()), 1e-3);
    }

    #[test]
    fn test_roundtrip_one_d() {
        let hcb = one_d();
        let decoded = HeaderControlBlock::decode(&hcb.encode().unwrap()).unwrap();
        assert_eq!(decoded, hcb);
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_two_d_little_endian_header() {
        let mut hcb = HeaderControlBlock::new(
            FormatCode::new(DataMode::Complex, ElementFormat::Float),
            Adjunct::TwoD {
                x: Axis::default(),
                subsize: 16,
                y: Axis {
                    start: -3.0,
                    delta: 0.5,
                    units: 0,
                },
            },
        );
        hcb.head_rep = ByteOrder::Eeei;
        hcb.keywords.push(("TC_PREC".to_string(), "1e-9".to_string()));
        let bytes = hcb.encode().unwrap();
        assert_eq!(i32::from_le_bytes(bytes[48..52].try_into().unwrap()), 2000);
        let decoded = HeaderControlBlock::decode(&bytes).unwrap();
        assert_eq!(decoded, hcb);
        assert_eq!(decoded.keyword("TC_PREC"), Some("1e-9"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            HeaderControlBlock::decode(&[0u8; 512]),
            Err(BlueError::BadVersion(_))
        ));
        assert!(matches!(
            HeaderControlBlock::decode(&[0u8; 100]),
            Err(BlueError::UnexpectedEof(100))
        ));
    }

    #[test]
    fn test_main_keyword_overflow() {
        let mut hcb = one_d();
        hcb.keywords.push(("LONG".to_string(), "x".repeat(100)));
        assert!(matches!(
            hcb.encode(),
            Err(BlueError::MainKeywordsOverflow { .. })
        ));
    }

    #[test]
    fn test_validate_detects_overlap() {
        let mut hcb = one_d();
        hcb.ext_start = 1;
        hcb.ext_size = 512;
        assert!(hcb.validate().is_err());
        hcb.ext_start = 2;
        assert!(hcb.validate().is_ok());
    }
}
