// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Destination URI handling.
//
// Destinations are written as `file:///abs/path` for the local disk or
// `sca:///path` for the remote file manager. A bare path is treated as
// local. The remote scheme is resolved through a `SchemeResolver`, which
// maps it onto a configured local root when no remote filesystem is
// reachable.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{StorageError, StorageResult};

pub const LOCAL_SCHEME: &str = "file://";
pub const REMOTE_SCHEME: &str = "sca://";

/// Which filesystem a URI addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriScheme {
    Local,
    Remote,
}

impl UriScheme {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Local => LOCAL_SCHEME,
            Self::Remote => REMOTE_SCHEME,
        }
    }
}

/// A parsed, normalized destination URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: UriScheme,
    /// Normalized path component.
    pub path: String,
}

impl Uri {
    /// Parse and normalize a URI string.
    pub fn parse(text: &str) -> StorageResult<Self> {
        let text = text.trim();
        let (scheme, rest) = if let Some(rest) = text.strip_prefix(LOCAL_SCHEME) {
            (UriScheme::Local, rest)
        } else if let Some(rest) = text.strip_prefix(REMOTE_SCHEME) {
            (UriScheme::Remote, rest)
        } else if text.contains("://") {
            return Err(StorageError::InvalidUri(text.to_string()));
        } else {
            (UriScheme::Local, text)
        };
        if rest.is_empty() {
            return Err(StorageError::InvalidUri(text.to_string()));
        }
        Ok(Self {
            scheme,
            path: normalize_path(rest),
        })
    }

    /// Everything up to the last `/`, or `.` when there is none.
    pub fn dirname(&self) -> &str {
        match self.path.rfind('/') {
            Some(0) => "/",
            Some(idx) => &self.path[..idx],
            None => ".",
        }
    }

    /// Everything after the last `/`.
    pub fn basename(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[idx + 1..],
            None => &self.path,
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scheme.prefix(), self.path)
    }
}

/// Normalize a URI string, defaulting the scheme to `file://`.
pub fn normalize_uri(text: &str) -> StorageResult<String> {
    Uri::parse(text).map(|uri| uri.to_string())
}

/// Collapse repeated separators and resolve `.` and `..` segments.
///
/// Absolute paths stay absolute; `..` never climbs above the root.
fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

// ---------------------------------------------------------------------------
// SchemeResolver
// ---------------------------------------------------------------------------

/// The local directory a URI resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    /// True when a remote URI was redirected under the fallback root.
    pub fell_back: bool,
}

/// Maps URIs onto local paths.
///
/// The fallback root is fixed at construction; it is never read from the
/// environment mid-operation.
#[derive(Debug, Clone)]
pub struct SchemeResolver {
    fallback_root: PathBuf,
    remote_root: Option<PathBuf>,
}

impl SchemeResolver {
    /// A resolver with no reachable remote filesystem.
    pub fn new(fallback_root: impl Into<PathBuf>) -> Self {
        Self {
            fallback_root: fallback_root.into(),
            remote_root: None,
        }
    }

    /// Mount remote URIs under `root` instead of falling back.
    pub fn with_remote_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.remote_root = Some(root.into());
        self
    }

    pub fn fallback_root(&self) -> &Path {
        &self.fallback_root
    }

    /// Resolve the directory part of a URI to a local path.
    pub fn resolve_dir(&self, uri: &Uri) -> ResolvedPath {
        let path = uri.dirname();
        match uri.scheme {
            UriScheme::Local => ResolvedPath {
                path: PathBuf::from(path),
                fell_back: false,
            },
            UriScheme::Remote => match &self.remote_root {
                Some(root) => ResolvedPath {
                    path: root.join(path.trim_start_matches('/')),
                    fell_back: false,
                },
                None => {
                    let path = self.fallback_root.join(path.trim_start_matches('/'));
                    warn!(
                        uri = %uri,
                        fallback = %path.display(),
                        "Remote filesystem unavailable, using local fallback root"
                    );
                    ResolvedPath {
                        path,
                        fell_back: true,
                    }
                }
            },
        }
    }
}
