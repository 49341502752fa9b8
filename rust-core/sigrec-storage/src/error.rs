// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the SigRec filesystem abstraction.
//
// Covers I/O failures, operations on files that were never opened, missing
// paths, malformed URIs and poisoned internal locks.

use thiserror::Error;

/// Errors that can occur when interacting with a filesystem implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// A handle operation was attempted on a file that is not open.
    #[error("file not open: {0}")]
    NotOpen(String),

    /// The URI could not be parsed.
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// An internal lock was poisoned by a panicking thread.
    #[error("filesystem lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;
