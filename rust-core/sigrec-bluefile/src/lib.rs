// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Encodes and decodes the self-describing BLUE container used by the
// recorder. A BLUE file is laid out as:
//
// ```text
// [512 bytes: header control block]   -- fixed fields, see `hcb`
// [N bytes:   data]                   -- samples in `data_rep` byte order
// [G bytes:   zero gap]               -- up to the next 512-byte boundary
// [E bytes:   extended header]        -- packed keywords, 512-byte multiple
// ```
//
// ## Usage
//
// ```
// use sigrec_bluefile::{
//     Adjunct, Axis, BlueKeyword, BlueValue, ByteOrder, DataMode, ElementFormat,
//     ExtendedHeader, ExtendedPlacement, FormatCode, HeaderControlBlock,
// };
//
// let mut hcb = HeaderControlBlock::new(
//     FormatCode::new(DataMode::Scalar, ElementFormat::Int),
//     Adjunct::OneD { x: Axis { start: 0.0, delta: 1e-6, units: 1 } },
// );
// let mut ext = ExtendedHeader::new();
// ext.insert(BlueKeyword::new("COL_RF", BlueValue::Double(1.5e9)));
//
// let data_end = 512 + 1000;
// let placement = ExtendedPlacement::after(data_end);
// let region = ext.pack(ByteOrder::Ieee).unwrap();
// hcb.data_size = 1000.0;
// hcb.ext_start = placement.start_block as i32;
// hcb.ext_size = region.len() as i32;
//
// let bytes = hcb.encode().unwrap();
// assert_eq!(HeaderControlBlock::decode(&bytes).unwrap(), hcb);
// ```

pub mod error;
pub mod extended;
pub mod format;
pub mod hcb;
pub mod keyword;
pub mod repr;
pub mod timecode;

/// BLUE block size; the HCB is one block and the extended header is
/// block-aligned.
pub const BLOCK_SIZE: usize = 512;

pub use error::{BlueError, BlueResult};
pub use extended::{ExtendedHeader, ExtendedPlacement};
pub use format::{DataMode, ElementFormat, FormatCode};
pub use hcb::{Adjunct, Axis, HeaderControlBlock, MAIN_KEYWORDS_LEN};
pub use keyword::{BlueKeyword, BlueValue, KeywordIndex, MAX_ASCII_KEYWORD_LEN};
pub use repr::ByteOrder;
pub use timecode::{PreciseTimecode, J1950_OFFSET_SECONDS, TC_PREC_KEYWORD};
