// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - JSON-lines packet captures
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A capture holds one `PacketRecord` per line:
//
// ```text
// {"sri":{"stream_id":"rx","xdelta":0.001},"timestamp":{"twsec":1700000000},
//  "data":{"type":"short","samples":[1,2,3]}}
// ```
//
// Blank lines and lines starting with `#` are skipped. The reader marks a
// packet's SRI as changed when it differs from the previous SRI of the same
// stream.

use std::collections::HashMap;
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, RecorderResult};
use crate::packet::{Packet, SampleBuffer};
use crate::sri::{Sri, Timestamp};

/// One packet as stored in a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Nominal stream; defaults to the SRI's stream id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub sri: Sri,
    /// Missing timestamps are treated as invalid.
    #[serde(default = "Timestamp::invalid")]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub eos: bool,
    pub data: SampleBuffer,
}

impl PacketRecord {
    pub fn into_packet(self) -> Packet {
        let mut packet = Packet::new(self.sri, self.timestamp, self.data).with_eos(self.eos);
        if let Some(stream_id) = self.stream_id {
            packet.stream_id = stream_id;
        }
        packet
    }
}

impl From<&Packet> for PacketRecord {
    fn from(packet: &Packet) -> Self {
        Self {
            stream_id: (packet.stream_id != packet.sri.stream_id).then(|| packet.stream_id.clone()),
            sri: packet.sri.clone(),
            timestamp: packet.timestamp,
            eos: packet.eos,
            data: packet.data.clone(),
        }
    }
}

/// Reads packets from a JSON-lines capture.
pub struct CaptureReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line: usize,
    last_sri: HashMap<String, Sri>,
}

impl<R: BufRead> CaptureReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            last_sri: HashMap::new(),
        }
    }

    /// Line number of the last line read.
    pub fn line(&self) -> usize {
        self.line
    }

    fn parse(&mut self, text: &str) -> RecorderResult<Packet> {
        let record: PacketRecord = serde_json::from_str(text).map_err(|e| {
            RecorderError::Config(format!("capture line {}: {e}", self.line))
        })?;
        let mut packet = record.into_packet();
        let changed = self.last_sri.get(&packet.stream_id) != Some(&packet.sri);
        if changed {
            self.last_sri
                .insert(packet.stream_id.clone(), packet.sri.clone());
        }
        packet.sri_changed = changed;
        if packet.eos {
            self.last_sri.remove(&packet.stream_id);
        }
        Ok(packet)
    }
}

impl<R: BufRead> Iterator for CaptureReader<R> {
    type Item = RecorderResult<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(self.parse(trimmed));
        }
    }
}
