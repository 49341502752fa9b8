// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SigRec Filesystem Abstraction
//
// This crate provides the handle-oriented filesystem interface the recorder
// writes through, so the same lifecycle code drives the local disk in
// production and an inspectable in-memory store in tests.
//
// # Modules
//
// - [`filesystem`] -- The `FileSystem` trait.
// - [`error`] -- The `StorageError` enum covering all filesystem failures.
// - [`local`] -- A `std::fs` implementation for the local disk.
// - [`memory`] -- An in-memory implementation with shared, inspectable state.
// - [`metrics`] -- A transparent wrapper that collects operation statistics.
// - [`uri`] -- Destination URI parsing, normalization and scheme resolution.
//
// # Example
//
// ```rust
// use std::path::Path;
// use sigrec_storage::{FileSystem, InMemoryFileSystem, MetricsFileSystem};
//
// let metered = MetricsFileSystem::new(InMemoryFileSystem::new());
// let path = Path::new("/data/stream.raw");
// metered.open(path, true, false).unwrap();
// metered.write(path, &[1, 2, 3, 4], false).unwrap();
// metered.close(path).unwrap();
// assert_eq!(metered.stats().bytes_written, 4);
// ```

pub mod error;
pub mod filesystem;
pub mod local;
pub mod memory;
pub mod metrics;
pub mod uri;

pub use error::{StorageError, StorageResult};
pub use filesystem::FileSystem;
pub use local::LocalFileSystem;
pub use memory::InMemoryFileSystem;
pub use metrics::{FileSystemStats, MetricsFileSystem};
pub use uri::{normalize_uri, ResolvedPath, SchemeResolver, Uri, UriScheme};
