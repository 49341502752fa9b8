// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory implementation of the SigRec filesystem trait.
//
// File contents live in a `BTreeMap` behind an `Arc<RwLock<...>>`, so clones
// share state: a test can hand one clone to the recorder and inspect the
// files it produced through another.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StorageError, StorageResult};
use crate::filesystem::FileSystem;

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    /// Position of every open handle.
    cursors: HashMap<PathBuf, u64>,
}

/// A filesystem held entirely in process memory.
///
/// Directories are tracked only so that `exists` answers for them; files
/// may be created under directories that were never made.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use sigrec_storage::{FileSystem, InMemoryFileSystem};
///
/// let fs = InMemoryFileSystem::new();
/// let view = fs.clone();
/// let path = Path::new("/data/x.raw");
///
/// fs.open(path, true, false).unwrap();
/// fs.write(path, b"abc", false).unwrap();
/// fs.close(path).unwrap();
///
/// assert_eq!(view.contents(path), Some(b"abc".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileSystem {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, replacing any previous contents.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        if let Ok(mut state) = self.state.write() {
            state.files.insert(path.into(), contents.into());
        }
    }

    /// A copy of the file contents.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().ok()?.files.get(path).cloned()
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state
            .read()
            .map(|state| state.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `path` currently has an open handle.
    pub fn is_open(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|state| state.cursors.contains_key(path))
            .unwrap_or(false)
    }

    fn read_state(&self) -> StorageResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write_state(&self) -> StorageResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StorageError::LockPoisoned)
    }
}

fn not_open(path: &Path) -> StorageError {
    StorageError::NotOpen(path.display().to_string())
}

fn not_found(path: &Path) -> StorageError {
    StorageError::NotFound(path.display().to_string())
}

impl FileSystem for InMemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.read_state()
            .map(|state| {
                state.files.contains_key(path)
                    || state.dirs.contains(path)
                    || state.files.keys().any(|file| file.starts_with(path))
            })
            .unwrap_or(false)
    }

    fn make_dir(&self, path: &Path) -> StorageResult<()> {
        let mut state = self.write_state()?;
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn open(&self, path: &Path, create: bool, append: bool) -> StorageResult<()> {
        let mut state = self.write_state()?;
        if state.cursors.contains_key(path) {
            return Ok(());
        }
        if !create && !state.files.contains_key(path) {
            return Err(not_found(path));
        }
        let file = state.files.entry(path.to_path_buf()).or_default();
        if !append {
            file.clear();
        }
        let position = file.len() as u64;
        state.cursors.insert(path.to_path_buf(), position);
        Ok(())
    }

    fn write(&self, path: &Path, data: &[u8], _force_flush: bool) -> StorageResult<()> {
        let mut state = self.write_state()?;
        let position = *state.cursors.get(path).ok_or_else(|| not_open(path))? as usize;
        let file = state.files.entry(path.to_path_buf()).or_default();
        let end = position + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[position..end].copy_from_slice(data);
        state.cursors.insert(path.to_path_buf(), end as u64);
        Ok(())
    }

    fn seek(&self, path: &Path, position: u64) -> StorageResult<()> {
        let mut state = self.write_state()?;
        let cursor = state.cursors.get_mut(path).ok_or_else(|| not_open(path))?;
        *cursor = position;
        Ok(())
    }

    fn tell(&self, path: &Path) -> StorageResult<u64> {
        self.read_state()?
            .cursors
            .get(path)
            .copied()
            .ok_or_else(|| not_open(path))
    }

    fn read(&self, path: &Path, len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.write_state()?;
        let position = *state.cursors.get(path).ok_or_else(|| not_open(path))? as usize;
        let file = state.files.get(path).ok_or_else(|| not_found(path))?;
        let start = position.min(file.len());
        let end = (position + len).min(file.len());
        let chunk = file[start..end].to_vec();
        state.cursors.insert(path.to_path_buf(), end as u64);
        Ok(chunk)
    }

    fn close(&self, path: &Path) -> StorageResult<()> {
        self.write_state()?.cursors.remove(path);
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let mut state = self.write_state()?;
        let contents = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), contents);
        if let Some(cursor) = state.cursors.remove(from) {
            state.cursors.insert(to.to_path_buf(), cursor);
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> StorageResult<bool> {
        let mut state = self.write_state()?;
        state.cursors.remove(path);
        Ok(state.files.remove(path).is_some())
    }

    fn size(&self, path: &Path) -> StorageResult<u64> {
        self.read_state()?
            .files
            .get(path)
            .map(|file| file.len() as u64)
            .ok_or_else(|| not_found(path))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let fs = InMemoryFileSystem::new();
        let view = fs.clone();
        let path = Path::new("/rec/a.raw");
        fs.open(path, true, false).unwrap();
        fs.write(path, b"1234", false).unwrap();
        assert_eq!(view.contents(path).unwrap(), b"1234");
        assert!(view.is_open(path));
        fs.close(path).unwrap();
        assert!(!view.is_open(path));
    }

    #[test]
    fn test_seek_past_end_zero_fills() {
        let fs = InMemoryFileSystem::new();
        let path = Path::new("/rec/b.tmp");
        fs.open(path, true, false).unwrap();
        fs.seek(path, 4).unwrap();
        fs.write(path, b"xy", false).unwrap();
        assert_eq!(fs.contents(path).unwrap(), [0, 0, 0, 0, b'x', b'y']);
    }

    #[test]
    fn test_overwrite_in_place() {
        let fs = InMemoryFileSystem::new();
        let path = Path::new("/rec/c.tmp");
        fs.insert(path, b"abcdef".to_vec());
        fs.open(path, false, true).unwrap();
        assert_eq!(fs.tell(path).unwrap(), 6);
        fs.seek(path, 1).unwrap();
        fs.write(path, b"ZZ", false).unwrap();
        assert_eq!(fs.read(path, 10).unwrap(), b"def");
        assert_eq!(fs.contents(path).unwrap(), b"aZZdef");
    }

    #[test]
    fn test_directories_exist_implicitly() {
        let fs = InMemoryFileSystem::new();
        fs.insert("/a/b/c.raw", Vec::new());
        assert!(fs.exists(Path::new("/a/b")));
        assert!(!fs.exists(Path::new("/x")));
        fs.make_dir(Path::new("/x/y")).unwrap();
        assert!(fs.exists(Path::new("/x")));
    }

    #[test]
    fn test_move_carries_open_cursor() {
        let fs = InMemoryFileSystem::new();
        let from = Path::new("/d/.f.inProgress");
        let to = Path::new("/d/f");
        fs.open(from, true, false).unwrap();
        fs.write(from, b"abc", false).unwrap();
        fs.move_file(from, to).unwrap();
        fs.write(to, b"d", false).unwrap();
        assert_eq!(fs.contents(to).unwrap(), b"abcd");
        assert!(fs.contents(from).is_none());
    }
}
