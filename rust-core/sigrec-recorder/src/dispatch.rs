// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Stream dispatch loop
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One pass polls every packet source once. Each packet goes through the
// timer gate, retune detection and a write loop that splits it across files
// when a size cap is reached:
//
//   open_or_continue -> update_sri -> write -> sidecar -> close on EOS/cap
//
// Errors end the current packet only; they never leave `process`.

use std::collections::VecDeque;

use sigrec_storage::FileSystem;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::error::RecorderError;
use crate::lifecycle::FileDecision;
use crate::packet::Packet;
use crate::recorder::Recorder;
use crate::sri::Timestamp;

/// Consecutive empty writes tolerated while data remains.
const MAX_STALLED_WRITES: u32 = 2;

/// A non-blocking source of packets, typically one per element type.
pub trait PacketSource {
    /// The next packet, or `None` when nothing is waiting.
    fn next_packet(&mut self) -> Option<Packet>;
}

impl PacketSource for VecDeque<Packet> {
    fn next_packet(&mut self) -> Option<Packet> {
        self.pop_front()
    }
}

impl PacketSource for UnboundedReceiver<Packet> {
    fn next_packet(&mut self) -> Option<Packet> {
        self.try_recv().ok()
    }
}

impl<F: FileSystem> Recorder<F> {
    /// Poll each source once and record what they yield. Returns whether
    /// any source had a packet.
    pub fn service(&mut self, sources: &mut [&mut dyn PacketSource]) -> bool {
        let mut worked = false;
        for source in sources.iter_mut() {
            if let Some(packet) = source.next_packet() {
                self.process(packet);
                worked = true;
            }
        }
        worked
    }

    /// Record one packet.
    pub fn process(&mut self, packet: Packet) {
        let stream_id = packet.effective_stream_id().to_string();
        let now = Timestamp::now();

        if !self.gate.evaluate(&packet.timestamp, &now) {
            let closed = self.lifecycle.close_all(&now, self.sink.as_mut());
            if closed > 0 {
                info!(closed, "Recording disabled, closed open files");
            }
            debug!(stream_id = %stream_id, error = %RecorderError::RecordingDisabled, "Dropping packet");
            return;
        }

        let decision = self.lifecycle.resolve(
            &stream_id,
            &packet.sri,
            &packet.timestamp,
            self.sink.as_mut(),
        );
        if decision == FileDecision::Capped {
            if packet.ends_stream() {
                self.lifecycle.release(&stream_id);
            }
            debug!(
                stream_id = %stream_id,
                error = %RecorderError::Capped(stream_id.clone()),
                "Dropping packet"
            );
            return;
        }

        let bytes = packet.data.to_bytes(self.config.swap_bytes);
        let ends_stream = packet.ends_stream();
        let mut offset = 0usize;
        let mut stalled = 0u32;
        let mut sri_forwarded = false;

        loop {
            if let Err(e) = self
                .lifecycle
                .open_or_continue(&stream_id, &packet, self.sink.as_mut())
            {
                log_dropped(&stream_id, &e);
                break;
            }
            if packet.sri_changed {
                self.lifecycle.update_sri(&stream_id, &packet.sri);
            }

            let outcome = match self.lifecycle.write(&stream_id, &bytes, offset) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(stream_id = %stream_id, offset, error = %e, "Write failed, dropping rest of packet");
                    break;
                }
            };
            let completes_packet = offset + outcome.written >= bytes.len();
            // A stalled write leaves no fragment to describe; an empty
            // packet still gets its entry.
            let has_fragment = outcome.written > 0 || bytes.is_empty();
            if has_fragment {
                if let Err(e) = self.lifecycle.write_metadata(
                    &stream_id,
                    &packet,
                    offset,
                    outcome.written,
                    ends_stream && completes_packet,
                ) {
                    error!(stream_id = %stream_id, error = %e, "Metadata write failed");
                    break;
                }
            }
            if packet.sri_changed && !sri_forwarded {
                let mut sri = packet.sri.clone();
                sri.stream_id = stream_id.clone();
                self.sink.sri_update(&sri);
                sri_forwarded = true;
            }
            offset += outcome.written;

            if ends_stream || outcome.reached_limit {
                self.lifecycle
                    .close(&stream_id, &packet.timestamp, self.sink.as_mut());
                if outcome.reached_limit && self.lifecycle.settings().reset_on_max_file {
                    self.lifecycle.release(&stream_id);
                }
            }
            if offset >= bytes.len() {
                break;
            }
            if outcome.written == 0 {
                stalled += 1;
                if stalled >= MAX_STALLED_WRITES {
                    warn!(
                        stream_id = %stream_id,
                        remaining = bytes.len() - offset,
                        "No room left in new files, dropping rest of packet"
                    );
                    break;
                }
            } else {
                stalled = 0;
            }
        }

        if ends_stream {
            self.lifecycle.release(&stream_id);
        }
    }
}

fn log_dropped(stream_id: &str, error: &RecorderError) {
    match error {
        RecorderError::Capped(_) => {
            debug!(stream_id = %stream_id, error = %error, "Dropping rest of packet");
        }
        RecorderError::PolicyRefused { .. } | RecorderError::OpenFailed { .. } => {
            warn!(stream_id = %stream_id, error = %error, "Dropping packet");
        }
        _ => {
            error!(stream_id = %stream_id, error = %error, "Dropping packet");
        }
    }
}
