// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for SigRec filesystems.
//
// Wraps any `FileSystem` and counts opens, writes, forced flushes, moves
// and deletes, together with byte totals and write latency. The recorder
// binary logs a snapshot at shutdown; tests use it to observe the flush
// policy.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::StorageResult;
use crate::filesystem::FileSystem;

/// Accumulated statistics for a filesystem.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MetricsFileSystem`] that owns them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSystemStats {
    /// Number of `open` calls.
    pub open_count: u64,
    /// Number of `close` calls.
    pub close_count: u64,
    /// Number of `write` calls.
    pub write_count: u64,
    /// Number of `write` calls that requested a forced flush.
    pub flush_count: u64,
    /// Number of `move_file` calls.
    pub move_count: u64,
    /// Number of `delete` calls.
    pub delete_count: u64,
    /// Total bytes written by successful writes.
    pub bytes_written: u64,
    /// Total bytes returned by reads.
    pub bytes_read: u64,
    /// Cumulative wall-clock latency of all `write` calls, in milliseconds.
    pub write_latency_sum_ms: f64,
}

/// A filesystem wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use sigrec_storage::{FileSystem, InMemoryFileSystem, MetricsFileSystem};
///
/// let metered = MetricsFileSystem::new(InMemoryFileSystem::new());
/// let path = Path::new("/x.raw");
/// metered.open(path, true, false).unwrap();
/// metered.write(path, b"abcd", true).unwrap();
///
/// let stats = metered.stats();
/// assert_eq!(stats.write_count, 1);
/// assert_eq!(stats.flush_count, 1);
/// assert_eq!(stats.bytes_written, 4);
/// ```
#[derive(Debug, Clone)]
pub struct MetricsFileSystem<F: FileSystem> {
    inner: F,
    stats: Arc<Mutex<FileSystemStats>>,
}

impl<F: FileSystem> MetricsFileSystem<F> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            stats: Arc::new(Mutex::new(FileSystemStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub fn stats(&self) -> FileSystemStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Reset all statistics to zero.
    pub fn reset_stats(&self) {
        if let Ok(mut s) = self.stats.lock() {
            *s = FileSystemStats::default();
        }
    }

    /// Return a reference to the inner filesystem.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn record(&self, update: impl FnOnce(&mut FileSystemStats)) {
        if let Ok(mut s) = self.stats.lock() {
            update(&mut s);
        }
    }
}

impl<F: FileSystem> FileSystem for MetricsFileSystem<F> {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn make_dir(&self, path: &Path) -> StorageResult<()> {
        self.inner.make_dir(path)
    }

    fn open(&self, path: &Path, create: bool, append: bool) -> StorageResult<()> {
        let result = self.inner.open(path, create, append);
        self.record(|s| s.open_count += 1);
        result
    }

    fn write(&self, path: &Path, data: &[u8], force_flush: bool) -> StorageResult<()> {
        let start = Instant::now();
        let result = self.inner.write(path, data, force_flush);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.record(|s| {
            s.write_count += 1;
            s.write_latency_sum_ms += elapsed_ms;
            if force_flush {
                s.flush_count += 1;
            }
            if result.is_ok() {
                s.bytes_written += data.len() as u64;
            }
        });
        result
    }

    fn seek(&self, path: &Path, position: u64) -> StorageResult<()> {
        self.inner.seek(path, position)
    }

    fn tell(&self, path: &Path) -> StorageResult<u64> {
        self.inner.tell(path)
    }

    fn read(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>> {
        let result = self.inner.read(path, len);
        if let Ok(ref bytes) = result {
            let n = bytes.len() as u64;
            self.record(|s| s.bytes_read += n);
        }
        result
    }

    fn close(&self, path: &Path) -> StorageResult<()> {
        self.record(|s| s.close_count += 1);
        self.inner.close(path)
    }

    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        self.record(|s| s.move_count += 1);
        self.inner.move_file(from, to)
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        self.record(|s| s.delete_count += 1);
        self.inner.delete(path)
    }

    fn size(&self, path: &Path) -> StorageResult<u64> {
        self.inner.size(path)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
