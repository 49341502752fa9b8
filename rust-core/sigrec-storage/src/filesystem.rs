// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core filesystem trait for the SigRec recorder.
//
// The recorder never touches `std::fs` directly. Every file it produces is
// driven through this handle-oriented interface: a path is opened once,
// written and repositioned by path, then closed. Implementations keep their
// own table of open handles and must be safe to share across threads.

use std::path::Path;

use crate::error::StorageResult;

/// A handle-oriented filesystem.
///
/// All handle operations (`write`, `seek`, `tell`, `read`) address a file by
/// the path it was opened with and fail with
/// [`StorageError::NotOpen`](crate::StorageError::NotOpen) if it is not open.
pub trait FileSystem: Send + Sync {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn make_dir(&self, path: &Path) -> StorageResult<()>;

    /// Open `path` for reading and writing.
    ///
    /// With `create` a missing file is created, otherwise it must exist.
    /// With `append` existing contents are kept and the position starts at
    /// the end; without it the file is truncated. Opening a path that is
    /// already open is a no-op that keeps the current position.
    fn open(&self, path: &Path, create: bool, append: bool) -> StorageResult<()>;

    /// Write `data` at the current position, advancing it.
    fn write(&self, path: &Path, data: &[u8], force_flush: bool) -> StorageResult<()>;

    /// Move the position to an absolute byte offset.
    fn seek(&self, path: &Path, position: u64) -> StorageResult<()>;

    /// The current position.
    fn tell(&self, path: &Path) -> StorageResult<u64>;

    /// Read up to `len` bytes from the current position.
    fn read(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>>;

    /// Close the handle. Closing a file that is not open is a no-op.
    fn close(&self, path: &Path) -> StorageResult<()>;

    /// Rename `from` to `to`, replacing any existing file.
    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Delete a file. Returns `Ok(false)` if nothing existed at `path`.
    fn delete(&self, path: &Path) -> StorageResult<bool>;

    /// Size of the file in bytes.
    fn size(&self, path: &Path) -> StorageResult<u64>;

    /// A human-readable name, used in logging and metrics.
    fn name(&self) -> &str;
}
