// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local disk implementation of the SigRec filesystem trait.
//
// Open handles are kept in a mutex-guarded map keyed by path. Forced flushes
// call `sync_data` so each acknowledged write reaches stable storage.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::filesystem::FileSystem;

/// A filesystem backed by the local disk.
#[derive(Debug, Default)]
pub struct LocalFileSystem {
    handles: Mutex<HashMap<PathBuf, File>>,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently open.
    pub fn open_count(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }

    fn handles(&self) -> StorageResult<MutexGuard<'_, HashMap<PathBuf, File>>> {
        self.handles.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn with_handle<T>(
        &self,
        path: &Path,
        op: impl FnOnce(&mut File) -> std::io::Result<T>,
    ) -> StorageResult<T> {
        let mut handles = self.handles()?;
        let file = handles
            .get_mut(path)
            .ok_or_else(|| StorageError::NotOpen(path.display().to_string()))?;
        Ok(op(file)?)
    }
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn make_dir(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn open(&self, path: &Path, create: bool, append: bool) -> StorageResult<()> {
        let mut handles = self.handles()?;
        if handles.contains_key(path) {
            return Ok(());
        }
        if !create && !path.exists() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(!append)
            .open(path)?;
        if append {
            file.seek(SeekFrom::End(0))?;
        }
        debug!(path = %path.display(), append, "Opened local file");
        handles.insert(path.to_path_buf(), file);
        Ok(())
    }

    fn write(&self, path: &Path, data: &[u8], force_flush: bool) -> StorageResult<()> {
        self.with_handle(path, |file| {
            file.write_all(data)?;
            if force_flush {
                file.flush()?;
                file.sync_data()?;
            }
            Ok(())
        })
    }

    fn seek(&self, path: &Path, position: u64) -> StorageResult<()> {
        self.with_handle(path, |file| file.seek(SeekFrom::Start(position)).map(|_| ()))
    }

    fn tell(&self, path: &Path) -> StorageResult<u64> {
        self.with_handle(path, |file| file.stream_position())
    }

    fn read(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>> {
        self.with_handle(path, |file| {
            let mut buf = Vec::with_capacity(len);
            file.take(len as u64).read_to_end(&mut buf)?;
            Ok(buf)
        })
    }

    fn close(&self, path: &Path) -> StorageResult<()> {
        if let Some(mut file) = self.handles()?.remove(path) {
            file.flush()?;
            debug!(path = %path.display(), "Closed local file");
        }
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        fs::rename(from, to)?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn size(&self, path: &Path) -> StorageResult<u64> {
        if let Some(file) = self.handles()?.get(path) {
            return Ok(file.metadata()?.len());
        }
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_write_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.raw");
        let fs = LocalFileSystem::new();

        fs.open(&path, true, false).unwrap();
        fs.write(&path, b"hello world", false).unwrap();
        assert_eq!(fs.tell(&path).unwrap(), 11);
        fs.seek(&path, 6).unwrap();
        assert_eq!(fs.read(&path, 100).unwrap(), b"world");
        fs.close(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert_eq!(fs.size(&path).unwrap(), 11);
    }

    #[test]
    fn test_append_keeps_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.raw");
        std::fs::write(&path, b"abc").unwrap();
        let fs = LocalFileSystem::new();

        fs.open(&path, true, true).unwrap();
        assert_eq!(fs.tell(&path).unwrap(), 3);
        fs.write(&path, b"def", true).unwrap();
        fs.close(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn test_truncate_on_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.raw");
        std::fs::write(&path, b"old contents").unwrap();
        let fs = LocalFileSystem::new();
        fs.open(&path, true, false).unwrap();
        fs.close(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_handle_ops_require_open() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("missing.raw");
        assert!(matches!(
            fs.write(&path, b"x", false),
            Err(StorageError::NotOpen(_))
        ));
        assert!(matches!(
            fs.open(&path, false, false),
            Err(StorageError::NotFound(_))
        ));
        fs.close(&path).unwrap();
    }

    #[test]
    fn test_move_and_delete() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let from = dir.path().join(".hidden.inProgress");
        let to = dir.path().join("final.raw");
        std::fs::write(&from, b"data").unwrap();

        fs.move_file(&from, &to).unwrap();
        assert!(!fs.exists(&from));
        assert!(fs.exists(&to));
        assert!(fs.delete(&to).unwrap());
        assert!(!fs.delete(&to).unwrap());
    }
}
