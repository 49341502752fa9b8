// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec BLUE Codec - Time codes
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// BLUE time codes count seconds since 1950-01-01. Packet timestamps count
// from 1970-01-01, so the two differ by a fixed 631,152,000 seconds.
//
// An f64 holding ~2.2e9 seconds keeps roughly microsecond resolution. When
// high precision is requested the start fraction is truncated to whole
// microseconds for the header field and the sub-microsecond remainder is
// carried as the `TC_PREC` main-header keyword.

/// Seconds between the J1950 and Unix epochs.
pub const J1950_OFFSET_SECONDS: f64 = 631_152_000.0;

/// Name of the main-header keyword carrying the sub-microsecond remainder.
pub const TC_PREC_KEYWORD: &str = "TC_PREC";

/// A header time code together with its optional precision remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseTimecode {
    /// Seconds since J1950.
    pub timecode: f64,
    /// Signed sub-microsecond remainder in seconds, absent when zero.
    pub tc_prec: Option<f64>,
}

impl PreciseTimecode {
    /// Build a time code from Unix whole and fractional seconds.
    pub fn from_unix(whole: f64, fraction: f64, high_precision: bool) -> Self {
        if !high_precision {
            return Self {
                timecode: whole + fraction + J1950_OFFSET_SECONDS,
                tc_prec: None,
            };
        }
        let micros = (fraction * 1e6).round() / 1e6;
        let remainder = ((fraction - micros) * 1e12).trunc() / 1e12;
        Self {
            timecode: whole + micros + J1950_OFFSET_SECONDS,
            tc_prec: (remainder != 0.0).then_some(remainder),
        }
    }

    /// The `TC_PREC` main-header keyword pair, if a remainder exists.
    pub fn keyword(&self) -> Option<(String, String)> {
        self.tc_prec
            .map(|rem| (TC_PREC_KEYWORD.to_string(), format!("{rem:e}")))
    }

    /// Recombine into Unix seconds.
    pub fn to_unix(&self) -> f64 {
        self.timecode - J1950_OFFSET_SECONDS + self.tc_prec.unwrap_or(0.0)
    }
}
