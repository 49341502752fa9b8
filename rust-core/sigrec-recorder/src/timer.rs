// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Recording timer gate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A schedule of enable/disable switches ordered by time. Each packet
// advances a forward-only cursor past every entry whose time has been
// reached, measured either on the wall clock or on the packet's own
// timestamp. The last entry crossed decides whether recording is on, and
// that decision sticks until another entry is crossed.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sri::Timestamp;

/// Which clock a timer entry is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// System time at the moment of evaluation.
    #[default]
    WallClock,
    /// The timestamp carried by the packet being evaluated.
    PacketTime,
}

/// One scheduled enable/disable switch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerEntry {
    pub recording_enable: bool,
    pub clock: ClockSource,
    pub twsec: f64,
    pub tfsec: f64,
}

impl Default for TimerEntry {
    fn default() -> Self {
        Self {
            recording_enable: true,
            clock: ClockSource::WallClock,
            twsec: 0.0,
            tfsec: 0.0,
        }
    }
}

impl TimerEntry {
    pub fn at_packet_time(recording_enable: bool, twsec: f64, tfsec: f64) -> Self {
        Self {
            recording_enable,
            clock: ClockSource::PacketTime,
            twsec,
            tfsec,
        }
    }

    pub fn at_wall_clock(recording_enable: bool, twsec: f64, tfsec: f64) -> Self {
        Self {
            recording_enable,
            clock: ClockSource::WallClock,
            twsec,
            tfsec,
        }
    }

    fn cmp_time(&self, other: &Self) -> Ordering {
        self.twsec
            .total_cmp(&other.twsec)
            .then_with(|| self.tfsec.total_cmp(&other.tfsec))
    }
}

/// Time-ordered recording schedule with a forward-only cursor.
#[derive(Debug, Clone)]
pub struct TimerGate {
    entries: Vec<TimerEntry>,
    cursor: usize,
    enabled: bool,
}

impl TimerGate {
    /// An empty schedule starting in the given state.
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            enabled,
        }
    }

    /// Replace the schedule and rewind the cursor.
    ///
    /// Entries are sorted by time; entries sharing a time keep their
    /// relative order, so the last of them wins once crossed.
    pub fn configure(&mut self, entries: &[TimerEntry]) {
        let mut entries = entries.to_vec();
        entries.sort_by(TimerEntry::cmp_time);
        info!(entries = entries.len(), "Recording timer reconfigured");
        self.entries = entries;
        self.cursor = 0;
    }

    /// Override the current state until the next entry is crossed.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Entries not yet crossed.
    pub fn pending(&self) -> &[TimerEntry] {
        &self.entries[self.cursor..]
    }

    /// Cross every entry at or before its clock's current time and return
    /// the resulting state.
    pub fn evaluate(&mut self, packet_time: &Timestamp, now: &Timestamp) -> bool {
        while let Some(entry) = self.entries.get(self.cursor) {
            let clock = match entry.clock {
                ClockSource::WallClock => now,
                ClockSource::PacketTime => packet_time,
            };
            if clock.cmp_time(entry.twsec, entry.tfsec) == Ordering::Less {
                break;
            }
            debug!(
                twsec = entry.twsec,
                tfsec = entry.tfsec,
                enable = entry.recording_enable,
                "Crossed recording timer entry"
            );
            self.enabled = entry.recording_enable;
            self.cursor += 1;
        }
        self.enabled
    }
}
