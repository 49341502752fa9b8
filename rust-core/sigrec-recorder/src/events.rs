// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Outbound events
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The recorder reports file opens and closes, completed files and stream
// description changes to a `RecorderSink`.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::sri::{Sri, Timestamp};

/// File operation reported by a [`FileEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileOperation {
    Open,
    Close,
}

/// A data file was opened or finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub operation: FileOperation,
    pub stream_id: String,
    /// Final path of the data file.
    pub filename: String,
}

/// A finalized file, published once per close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedFile {
    pub filename: String,
    /// When the file was finalized.
    pub timestamp: Timestamp,
    pub eos: bool,
    pub stream_id: String,
}

/// Receives recorder notifications.
pub trait RecorderSink: Send {
    fn file_event(&mut self, event: FileEvent);

    fn completed_file(&mut self, file: CompletedFile);

    /// The stream description of `sri.stream_id` changed.
    fn sri_update(&mut self, sri: &Sri);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RecorderSink for NullSink {
    fn file_event(&mut self, _event: FileEvent) {}

    fn completed_file(&mut self, _file: CompletedFile) {}

    fn sri_update(&mut self, _sri: &Sri) {}
}

/// One notification, as delivered by [`MemorySink`] and [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkMessage {
    File(FileEvent),
    Completed(CompletedFile),
    Sri(Sri),
}

/// Collects notifications in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<SinkMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message received so far.
    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn file_events(&self) -> Vec<FileEvent> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::File(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn completed_files(&self) -> Vec<CompletedFile> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::Completed(file) => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn sri_updates(&self) -> Vec<Sri> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                SinkMessage::Sri(sri) => Some(sri),
                _ => None,
            })
            .collect()
    }

    fn push(&self, message: SinkMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

impl RecorderSink for MemorySink {
    fn file_event(&mut self, event: FileEvent) {
        self.push(SinkMessage::File(event));
    }

    fn completed_file(&mut self, file: CompletedFile) {
        self.push(SinkMessage::Completed(file));
    }

    fn sri_update(&mut self, sri: &Sri) {
        self.push(SinkMessage::Sri(sri.clone()));
    }
}

/// Forwards notifications over a tokio channel.
///
/// A closed receiver is logged once and later messages are dropped.
#[derive(Debug)]
pub struct ChannelSink {
    tx: UnboundedSender<SinkMessage>,
    closed: bool,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<SinkMessage>) -> Self {
        Self { tx, closed: false }
    }

    fn send(&mut self, message: SinkMessage) {
        if self.closed {
            return;
        }
        if self.tx.send(message).is_err() {
            warn!("Event receiver dropped, discarding recorder events");
            self.closed = true;
        }
    }
}

impl RecorderSink for ChannelSink {
    fn file_event(&mut self, event: FileEvent) {
        self.send(SinkMessage::File(event));
    }

    fn completed_file(&mut self, file: CompletedFile) {
        self.send(SinkMessage::Completed(file));
    }

    fn sri_update(&mut self, sri: &Sri) {
        self.send(SinkMessage::Sri(sri.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn open_event() -> FileEvent {
        FileEvent {
            operation: FileOperation::Open,
            stream_id: "s".into(),
            filename: "/tmp/s.raw".into(),
        }
    }

    #[test]
    fn test_memory_sink_clones_share_log() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.file_event(open_event());
        writer.sri_update(&Sri::new("s"));
        assert_eq!(sink.file_events(), vec![open_event()]);
        assert_eq!(sink.sri_updates().len(), 1);
        assert!(sink.completed_files().is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        sink.file_event(open_event());
        sink.completed_file(CompletedFile {
            filename: "/tmp/s.raw".into(),
            timestamp: Timestamp::new(1.0, 0.0),
            eos: true,
            stream_id: "s".into(),
        });
        assert_eq!(rx.recv().await, Some(SinkMessage::File(open_event())));
        assert!(matches!(rx.recv().await, Some(SinkMessage::Completed(f)) if f.eos));
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.file_event(open_event());
        sink.file_event(open_event());
        assert!(sink.closed);
    }

    #[test]
    fn test_file_operation_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&FileOperation::Close).unwrap(), "\"CLOSE\"");
    }
}
