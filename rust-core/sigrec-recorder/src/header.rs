// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - BLUE header maintenance
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A BLUE data file is written with a 512-byte hole at the front. When the
// file is finalized the header control block is written into the hole and
// the extended header is appended at the next block boundary after the
// data. Appending to an existing BLUE file reads its header back to find
// where the data ends.

use std::path::Path;

use sigrec_bluefile::{
    Adjunct, Axis, ExtendedPlacement, HeaderControlBlock, PreciseTimecode, BLOCK_SIZE,
};
use sigrec_storage::FileSystem;
use tracing::{debug, warn};

use crate::error::RecorderResult;
use crate::lifecycle::FileRecord;
use crate::sri::Sri;

/// The adjunct block describing `sri`'s axes.
pub fn adjunct_for(sri: &Sri) -> Adjunct {
    let x = Axis {
        start: sri.xstart,
        delta: sri.xdelta,
        units: i32::from(sri.xunits),
    };
    if sri.subsize > 0 {
        Adjunct::TwoD {
            x,
            subsize: sri.subsize,
            y: Axis {
                start: sri.ystart,
                delta: sri.ydelta,
                units: i32::from(sri.yunits),
            },
        }
    } else {
        Adjunct::OneD { x }
    }
}

/// Build the header control block for `record` with `data_size` bytes of
/// data, leaving the extended-header placement unset.
pub fn header_for(record: &FileRecord, data_size: u64, use_tc_prec: bool) -> HeaderControlBlock {
    let mut hcb = HeaderControlBlock::new(record.format_code, adjunct_for(&record.last_sri));
    hcb.data_rep = record.data_rep;
    hcb.data_size = data_size as f64;
    let timecode = PreciseTimecode::from_unix(record.start.twsec, record.start.tfsec, use_tc_prec);
    hcb.timecode = timecode.timecode;
    hcb.keywords.extend(timecode.keyword());
    hcb
}

/// Write the header control block and extended header of a BLUE file
/// whose data ends at the current position.
///
/// The file must be open; it stays open.
pub fn finalize_blue(
    fs: &dyn FileSystem,
    record: &FileRecord,
    use_tc_prec: bool,
    force_flush: bool,
) -> RecorderResult<()> {
    let path = &record.in_process;
    let data_end = fs.tell(path)?.max(BLOCK_SIZE as u64);
    let data_size = data_end - BLOCK_SIZE as u64;

    let mut hcb = header_for(record, data_size, use_tc_prec);
    let region = record.keywords.to_extended_header().pack(hcb.head_rep)?;
    let placement = ExtendedPlacement::after(data_end);
    if !region.is_empty() {
        hcb.ext_start = placement.start_block as i32;
        hcb.ext_size = region.len() as i32;
    }

    fs.seek(path, 0)?;
    fs.write(path, &hcb.encode()?, force_flush)?;
    fs.seek(path, data_end)?;
    if !region.is_empty() {
        let mut tail = vec![0u8; placement.gap];
        tail.extend_from_slice(&region);
        fs.write(path, &tail, force_flush)?;
    }
    debug!(
        file = %path.display(),
        data_size,
        ext_start = hcb.ext_start,
        ext_size = hcb.ext_size,
        "Wrote BLUE header"
    );
    Ok(())
}

/// Position a freshly opened BLUE file for writing data.
///
/// An empty file skips the header block. A file that already holds data
/// and has no other writer has its header read back; the position moves to
/// the end of its data and the data size is returned. A header that fails
/// to decode or validate is logged and the file is written from its end.
pub fn prepare_blue(fs: &dyn FileSystem, path: &Path, sole_writer: bool) -> RecorderResult<Option<u64>> {
    let position = fs.tell(path)?;
    if position == 0 {
        fs.seek(path, BLOCK_SIZE as u64)?;
        return Ok(None);
    }
    if !sole_writer {
        return Ok(None);
    }

    fs.seek(path, 0)?;
    let bytes = fs.read(path, BLOCK_SIZE)?;
    let hcb = HeaderControlBlock::decode(&bytes).and_then(|hcb| hcb.validate().map(|()| hcb));
    match hcb {
        Ok(hcb) => {
            fs.seek(path, hcb.data_end())?;
            Ok(Some(hcb.data_size as u64))
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Cannot read BLUE header for appending");
            fs.seek(path, position)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use sigrec_bluefile::{BlueValue, ByteOrder, ExtendedHeader};
    use sigrec_storage::InMemoryFileSystem;

    use crate::config::FileFormat;
    use crate::keywords::KeywordTable;
    use crate::packet::ElementType;
    use crate::sri::{KeywordValue, Timestamp};

    fn record(sri: Sri) -> FileRecord {
        FileRecord::new(
            PathBuf::from("/d/a.bluefile"),
            PathBuf::from("/d/.a.bluefile"),
            FileFormat::Bluefile,
            "s",
            &sri,
            ElementType::Short,
        )
        .with_data_rep(ByteOrder::Eeei)
        .with_start(Timestamp::new(1_000.0, 0.123_456_789))
    }

    #[test]
    fn test_two_d_adjunct_when_subsize_set() {
        let mut sri = Sri::new("s");
        assert_eq!(adjunct_for(&sri).type_code(), 1000);
        sri.subsize = 16;
        sri.ydelta = 0.5;
        match adjunct_for(&sri) {
            Adjunct::TwoD { subsize, y, .. } => {
                assert_eq!(subsize, 16);
                assert_eq!(y.delta, 0.5);
            }
            other => panic!("unexpected adjunct {other:?}"),
        }
    }

    #[test]
    fn test_header_carries_tc_prec() {
        let rec = record(Sri::new("s").with_xdelta(1e-3));
        let hcb = header_for(&rec, 100, true);
        assert_eq!(hcb.data_rep, ByteOrder::Eeei);
        assert_eq!(hcb.data_size, 100.0);
        assert!(hcb.keyword("TC_PREC").is_some());
        assert!((hcb.timecode - (631_152_000.0 + 1_000.123_457)).abs() < 5e-7);

        let plain = header_for(&rec, 100, false);
        assert!(plain.keyword("TC_PREC").is_none());
    }

    #[test]
    fn test_finalize_places_extended_header() {
        let fs = InMemoryFileSystem::new();
        let sri = Sri::new("s").with_keyword("COL_RF", KeywordValue::Double(5.0));
        let mut rec = record(sri.clone());
        rec.keywords = KeywordTable::from_sri(&sri);
        let path = rec.in_process.clone();

        fs.open(&path, true, false).unwrap();
        assert_eq!(prepare_blue(&fs, &path, true).unwrap(), None);
        fs.write(&path, &[7u8; 100], false).unwrap();
        finalize_blue(&fs, &rec, true, false).unwrap();

        let bytes = fs.contents(&path).unwrap();
        let hcb = HeaderControlBlock::decode(&bytes).unwrap();
        assert_eq!(hcb.data_size, 100.0);
        assert_eq!(hcb.ext_start, 2);
        assert_eq!(bytes.len(), 1024 + hcb.ext_size as usize);
        assert_eq!(bytes.len() % 512, 0);
        assert!(bytes[612..1024].iter().all(|b| *b == 0));

        let entries = ExtendedHeader::unpack(&bytes[1024..], hcb.head_rep).unwrap();
        assert_eq!(entries, vec![("COL_RF".to_string(), BlueValue::Double(5.0))]);
    }

    #[test]
    fn test_prepare_reads_existing_header() {
        let fs = InMemoryFileSystem::new();
        let rec = record(Sri::new("s"));
        let path = rec.in_process.clone();
        fs.open(&path, true, false).unwrap();
        prepare_blue(&fs, &path, true).unwrap();
        fs.write(&path, &[1u8; 40], false).unwrap();
        finalize_blue(&fs, &rec, false, false).unwrap();
        fs.close(&path).unwrap();

        fs.open(&path, false, true).unwrap();
        assert_eq!(prepare_blue(&fs, &path, true).unwrap(), Some(40));
        assert_eq!(fs.tell(&path).unwrap(), 552);
    }

    #[test]
    fn test_prepare_tolerates_garbage_header() {
        let fs = InMemoryFileSystem::new();
        let path = Path::new("/d/junk");
        fs.insert(path, vec![0xAB; 600]);
        fs.open(path, false, true).unwrap();
        assert_eq!(prepare_blue(&fs, path, true).unwrap(), None);
        assert_eq!(fs.tell(path).unwrap(), 600);
    }
}
