// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Extended header
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The extended header follows the data region, starting on a 512-byte block
// boundary. Each packed entry has the layout (numbers in header byte order):
//
//   [4 bytes: next_offset (i32)]    -- entry length including padding
//   [2 bytes: non_data_len (i16)]   -- next_offset minus the data length
//   [1 byte:  name_len (u8)]
//   [1 byte:  type]                 -- B O I L X F D A
//   [N bytes: data]
//   [M bytes: name]
//   [P bytes: zero padding]         -- to an 8-byte multiple
//
// The region is zero padded to a whole number of blocks; that padding is
// folded into the next_offset and non_data_len of the final entry so a
// reader walking the chain lands exactly on the region end.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BlueError, BlueResult};
use crate::keyword::{BlueKeyword, BlueValue};
use crate::repr::{ByteOrder, FieldReader, FieldWriter};
use crate::BLOCK_SIZE;

const ENTRY_FIXED_SIZE: usize = 8;
const ENTRY_ALIGNMENT: usize = 8;

/// Where the extended header lands relative to the end of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedPlacement {
    /// First block of the region (`ext_start` in the header).
    pub start_block: u64,
    /// Zero bytes to write between the end of data and the region.
    pub gap: usize,
}

impl ExtendedPlacement {
    /// Compute the placement for data ending at byte `data_end`.
    pub fn after(data_end: u64) -> Self {
        let block = BLOCK_SIZE as u64;
        let start_block = data_end.div_ceil(block);
        Self {
            start_block,
            gap: (start_block * block - data_end) as usize,
        }
    }

    /// Absolute byte offset of the region.
    pub fn offset(&self) -> u64 {
        self.start_block * BLOCK_SIZE as u64
    }
}

/// A set of keywords kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedHeader {
    keywords: BTreeMap<String, BlueKeyword>,
}

impl ExtendedHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a keyword.
    pub fn insert(&mut self, keyword: BlueKeyword) {
        self.keywords.insert(keyword.name.clone(), keyword);
    }

    pub fn get(&self, name: &str) -> Option<&BlueKeyword> {
        self.keywords.get(name)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlueKeyword> {
        self.keywords.values()
    }

    /// Pack every keyword into a block-aligned region.
    ///
    /// An empty header packs to an empty region.
    pub fn pack(&self, order: ByteOrder) -> BlueResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut last_entry = None;

        for keyword in self.keywords.values() {
            for (name, value) in keyword.entries() {
                if name.len() > u8::MAX as usize {
                    return Err(BlueError::KeywordNameTooLong {
                        len: name.len(),
                        name,
                    });
                }
                let data = value.encode(order);
                let unpadded = ENTRY_FIXED_SIZE + data.len() + name.len();
                let entry_len = unpadded.next_multiple_of(ENTRY_ALIGNMENT);

                let start = out.len();
                out.resize(start + entry_len, 0);
                let mut writer = FieldWriter::new(&mut out[start..], order);
                writer.put_i32(0, entry_len as i32);
                writer.put_i16(4, (entry_len - data.len()) as i16);
                writer.put_bytes(6, &[name.len() as u8, value.type_code()]);
                writer.put_bytes(ENTRY_FIXED_SIZE, &data);
                writer.put_bytes(ENTRY_FIXED_SIZE + data.len(), name.as_bytes());

                last_entry = Some((start, data.len()));
            }
        }

        let remainder = out.len() % BLOCK_SIZE;
        if remainder != 0 {
            let pad = BLOCK_SIZE - remainder;
            if let Some((start, data_len)) = last_entry {
                let entry_len = out.len() - start + pad;
                let mut writer = FieldWriter::new(&mut out[start..], order);
                writer.put_i32(0, entry_len as i32);
                writer.put_i16(4, (entry_len - data_len) as i16);
            }
            out.resize(out.len() + pad, 0);
        }

        debug!(
            keywords = self.keywords.len(),
            bytes = out.len(),
            "Packed extended header"
        );
        Ok(out)
    }

    /// Walk a packed region and return its raw entries in order.
    ///
    /// Companion entries (`.UNITS`, `.INDEX`) are returned as separate
    /// entries.
    pub fn unpack(region: &[u8], order: ByteOrder) -> BlueResult<Vec<(String, BlueValue)>> {
        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + ENTRY_FIXED_SIZE <= region.len() {
            let reader = FieldReader::new(&region[offset..], order);
            let entry_len = reader.get_i32(0)?;
            if entry_len <= 0 {
                break;
            }
            let entry_len = entry_len as usize;
            let non_data = reader.get_i16(4)? as usize;
            let head = reader.get_bytes(6, 2)?;
            let (name_len, type_code) = (head[0] as usize, head[1]);

            let data_len = entry_len
                .checked_sub(non_data)
                .ok_or_else(|| BlueError::Invalid(format!("entry at {offset} has negative data length")))?;
            let data = reader
                .get_bytes(ENTRY_FIXED_SIZE, data_len)
                .map_err(|_| BlueError::UnexpectedEof(offset + ENTRY_FIXED_SIZE))?;
            let name = reader
                .get_bytes(ENTRY_FIXED_SIZE + data_len, name_len)
                .map_err(|_| BlueError::UnexpectedEof(offset + ENTRY_FIXED_SIZE + data_len))?;

            let name = String::from_utf8(name.to_vec())?;
            let value = BlueValue::decode(type_code, data, order)?;
            entries.push((name, value));
            offset += entry_len;
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> ExtendedHeader {
        let mut header = ExtendedHeader::new();
        header.insert(BlueKeyword::new("ZETA", BlueValue::Double(2.5)));
        header.insert(BlueKeyword::new("ALPHA", BlueValue::Int(7)));
        header.insert(BlueKeyword::new("NAME", BlueValue::ascii("hello").unwrap()));
        header
    }

    #[test]
    fn test_placement_rounds_to_block() {
        assert_eq!(
            ExtendedPlacement::after(512),
            ExtendedPlacement { start_block: 1, gap: 0 }
        );
        let placement = ExtendedPlacement::after(522);
        assert_eq!(placement.start_block, 2);
        assert_eq!(placement.gap, 502);
        assert_eq!(placement.offset(), 1024);
    }

    #[test]
    fn test_pack_is_block_aligned_and_sorted() {
        let region = sample_header().pack(ByteOrder::Ieee).unwrap();
        assert_eq!(region.len(), BLOCK_SIZE);

        let entries = ExtendedHeader::unpack(&region, ByteOrder::Ieee).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["ALPHA", "NAME", "ZETA"]);
        assert_eq!(entries[1].1, BlueValue::Ascii("hello".to_string()));
    }

    #[test]
    fn test_entry_layout() {
        let mut header = ExtendedHeader::new();
        header.insert(BlueKeyword::new("AB", BlueValue::Long(1)));
        header.insert(BlueKeyword::new("CD", BlueValue::Long(2)));
        let region = header.pack(ByteOrder::Eeei).unwrap();

        // 8 fixed + 4 data + 2 name = 14, padded to 16.
        assert_eq!(i32::from_le_bytes(region[0..4].try_into().unwrap()), 16);
        assert_eq!(i16::from_le_bytes(region[4..6].try_into().unwrap()), 12);
        assert_eq!(region[6], 2);
        assert_eq!(region[7], b'L');
        assert_eq!(&region[12..14], b"AB");

        // The last entry absorbs the block padding.
        assert_eq!(i32::from_le_bytes(region[16..20].try_into().unwrap()), 512 - 16);
        assert_eq!(i16::from_le_bytes(region[20..22].try_into().unwrap()), 512 - 16 - 4);
    }

    #[test]
    fn test_units_and_index_companions_are_packed() {
        let mut header = ExtendedHeader::new();
        header.insert(
            BlueKeyword::new("FREQ", BlueValue::Double(1.0))
                .with_units(3)
                .with_index(BlueValue::Long(4), Some(0)),
        );
        let entries =
            ExtendedHeader::unpack(&header.pack(ByteOrder::Ieee).unwrap(), ByteOrder::Ieee).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1], ("FREQ.UNITS".to_string(), BlueValue::Int(3)));
        assert_eq!(entries[2], ("FREQ.INDEX".to_string(), BlueValue::Long(4)));
    }

    #[test]
    fn test_empty_header_packs_to_nothing() {
        assert!(ExtendedHeader::new().pack(ByteOrder::Ieee).unwrap().is_empty());
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut header = sample_header();
        header.insert(BlueKeyword::new("ALPHA", BlueValue::Int(9)));
        assert_eq!(header.len(), 3);
        assert_eq!(header.get("ALPHA").unwrap().value, BlueValue::Int(9));
    }
}
