// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for JSON-lines packet captures.
// Run with: cargo +nightly fuzz run fuzz_capture_line
//
// Every line either yields a packet or an error; a packet's bytes must be
// producible in both byte orders.

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use sigrec_recorder::CaptureReader;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    for packet in CaptureReader::new(Cursor::new(data)).flatten() {
        let _ = packet.data.to_bytes(false);
        let _ = packet.data.to_bytes(true);
    }
});
