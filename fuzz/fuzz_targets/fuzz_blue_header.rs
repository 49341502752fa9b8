// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for BLUE header decoding.
// Run with: cargo +nightly fuzz run fuzz_blue_header
//
// Treats the input as the start of a BLUE file. The header control block
// and the extended header region must be rejected with an error, never a
// panic, however they are corrupted.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigrec_bluefile::{ByteOrder, ExtendedHeader, HeaderControlBlock, BLOCK_SIZE};

fuzz_target!(|data: &[u8]| {
    if let Ok(hcb) = HeaderControlBlock::decode(data) {
        let _ = hcb.validate();
        let _ = hcb.encode();
    }
    if data.len() > BLOCK_SIZE {
        let region = &data[BLOCK_SIZE..];
        let _ = ExtendedHeader::unpack(region, ByteOrder::Ieee);
        let _ = ExtendedHeader::unpack(region, ByteOrder::Eeei);
    }
});
