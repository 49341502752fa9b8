// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Errors raised by reconfiguration and by one packet's trip through the
// file lifecycle. Packet-level errors never leave the dispatch loop; they are
// logged and the packet (or the rest of it) is dropped.

use std::path::PathBuf;

use sigrec_bluefile::BlueError;
use sigrec_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while configuring the recorder or writing a packet.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The configuration is unusable; nothing was applied.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The destination directory is missing and may not be created.
    #[error("Destination directory {0} does not exist")]
    DestinationMissing(PathBuf),

    /// The existing-file policy refused the target file.
    #[error("Existing file policy refused {path}: {reason}")]
    PolicyRefused {
        /// The file the policy was applied to.
        path: PathBuf,
        /// Why it was refused.
        reason: &'static str,
    },

    /// The data or metadata file could not be opened.
    #[error("Could not open {path}: {source}")]
    OpenFailed {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: StorageError,
    },

    /// The stream's file reached its size cap; packets are dropped until
    /// end of stream.
    #[error("Stream {0} reached its size cap, dropping until end of stream")]
    Capped(String),

    /// No file is open for the stream.
    #[error("No file open for stream {0}")]
    NoFile(String),

    /// Recording is disabled by the global flag or the timer schedule.
    #[error("Recording disabled, dropping packet")]
    RecordingDisabled,

    /// A filesystem operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A BLUE header could not be encoded.
    #[error("BLUE header error: {0}")]
    Bluefile(#[from] BlueError),

    /// JSON (de)serialization of configuration or captures failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error outside the filesystem abstraction.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shared recorder lock was poisoned by a panicking thread.
    #[error("Recorder lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for recorder results.
pub type RecorderResult<T> = Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_refused_display() {
        let error = RecorderError::PolicyRefused {
            path: PathBuf::from("/data/a.raw"),
            reason: "file exists",
        };
        let message = error.to_string();
        assert!(message.contains("/data/a.raw"));
        assert!(message.contains("file exists"));
    }

    #[test]
    fn test_open_failed_keeps_source() {
        let error = RecorderError::OpenFailed {
            path: PathBuf::from("/x"),
            source: StorageError::NotFound("/x".to_string()),
        };
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_storage_error_converts() {
        let error: RecorderError = StorageError::LockPoisoned.into();
        assert!(matches!(error, RecorderError::Storage(_)));
    }
}
