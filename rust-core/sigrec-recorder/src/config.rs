// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Configuration
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recorder configuration, loaded from JSON. Every field has a default so a
// config file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sigrec_storage::{FileSystem, SchemeResolver, Uri};
use tracing::info;

use crate::error::{RecorderError, RecorderResult};
use crate::naming::FilenameCase;
use crate::timer::TimerEntry;

/// Default destination template.
pub const DEFAULT_DESTINATION_URI: &str = "file:///tmp/%STREAMID%.%TIMESTAMP%.%MODE%.%SR%.%DT%";

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileFormat {
    /// Samples only.
    #[default]
    Raw,
    /// Samples framed by a BLUE header and extended header.
    Bluefile,
}

impl FileFormat {
    /// Value of the `%EXTENSION%` token.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Bluefile => "bluefile",
        }
    }
}

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExistingFilePolicy {
    /// Drop the packet.
    Drop,
    /// Delete the file unless this recorder is writing it.
    Truncate,
    /// Pick the first free `name-N`.
    #[default]
    Rename,
    /// Add to the end of the file.
    Append,
}

/// Byte order of incoming samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputByteOrder {
    #[default]
    HostOrder,
    LittleEndian,
    BigEndian,
}

impl InputByteOrder {
    pub fn is_little_endian(self) -> bool {
        match self {
            Self::HostOrder => cfg!(target_endian = "little"),
            Self::LittleEndian => true,
            Self::BigEndian => false,
        }
    }
}

/// File lifecycle tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedProperties {
    /// Flush to stable storage after every write.
    pub force_flush: bool,
    /// `N`, `NB`, `NKB`, `NMB`, `NGB` or `UNLIMITED`.
    pub max_file_size: String,
    /// Seconds of data per file; zero or negative disables.
    pub max_file_time: f64,
    pub existing_file: ExistingFilePolicy,
    pub create_destination_dir: bool,
    pub enable_metadata_file: bool,
    /// Open a fresh file once the size cap is reached.
    pub reset_on_max_file: bool,
    /// Open a fresh file when the sample rate, mode or frequency changes.
    pub reset_on_retune: bool,
    /// Write under a dot-prefixed name until the file is closed.
    pub use_hidden_files: bool,
    pub open_file_extension: String,
    pub open_metadata_file_extension: String,
    /// Carry the sub-microsecond start time as `TC_PREC`.
    pub use_tc_prec: bool,
    pub output_filename_case: FilenameCase,
}

impl Default for AdvancedProperties {
    fn default() -> Self {
        Self {
            force_flush: false,
            max_file_size: "UNLIMITED".to_string(),
            max_file_time: -1.0,
            existing_file: ExistingFilePolicy::Rename,
            create_destination_dir: true,
            enable_metadata_file: false,
            reset_on_max_file: true,
            reset_on_retune: true,
            use_hidden_files: true,
            open_file_extension: "inProgress".to_string(),
            open_metadata_file_extension: "inProgress".to_string(),
            use_tc_prec: true,
            output_filename_case: FilenameCase::Mixed,
        }
    }
}

/// Recorder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory and basename template of the output files.
    pub destination_uri: String,
    /// Appended to `destination_uri` before parsing.
    pub destination_uri_suffix: String,
    pub file_format: FileFormat,
    /// Reverse every multi-byte element before writing.
    pub swap_bytes: bool,
    pub input_byte_order: InputByteOrder,
    pub recording_enabled: bool,
    /// Value of the `%COMP_NS_NAME%` token.
    pub component_name: String,
    /// Local root used for remote destinations.
    pub fallback_root: PathBuf,
    pub advanced: AdvancedProperties,
    pub recording_timer: Vec<TimerEntry>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            destination_uri: DEFAULT_DESTINATION_URI.to_string(),
            destination_uri_suffix: String::new(),
            file_format: FileFormat::Raw,
            swap_bytes: false,
            input_byte_order: InputByteOrder::HostOrder,
            recording_enabled: true,
            component_name: "sigrec".to_string(),
            fallback_root: PathBuf::from("/tmp"),
            advanced: AdvancedProperties::default(),
            recording_timer: Vec::new(),
        }
    }
}

/// Where files go once the destination URI has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Local directory the files are written to.
    pub directory: PathBuf,
    /// Basename template.
    pub template: String,
}

impl RecorderConfig {
    /// Parse a JSON configuration.
    pub fn from_json_str(text: &str) -> RecorderResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> RecorderResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Whether samples land on disk little-endian.
    pub fn output_little_endian(&self) -> bool {
        self.input_byte_order.is_little_endian() != self.swap_bytes
    }

    /// Size cap in bytes, `None` when unlimited.
    pub fn max_file_bytes(&self) -> RecorderResult<Option<u64>> {
        parse_max_file_size(&self.advanced.max_file_size)
    }

    /// The destination URI with its suffix, parsed and normalized.
    pub fn destination_uri(&self) -> RecorderResult<Uri> {
        let text = format!("{}{}", self.destination_uri, self.destination_uri_suffix);
        Uri::parse(&text).map_err(|e| RecorderError::Config(e.to_string()))
    }

    /// Resolve the destination directory, creating it when allowed.
    pub fn resolve_destination(&self, fs: &dyn FileSystem) -> RecorderResult<Destination> {
        let uri = self.destination_uri()?;
        let resolved = SchemeResolver::new(&self.fallback_root).resolve_dir(&uri);
        if !fs.exists(&resolved.path) {
            if !self.advanced.create_destination_dir {
                return Err(RecorderError::DestinationMissing(resolved.path));
            }
            fs.make_dir(&resolved.path)?;
            info!(directory = %resolved.path.display(), "Created destination directory");
        }
        Ok(Destination {
            directory: resolved.path,
            template: uri.basename().to_string(),
        })
    }

    /// Check every field that can be checked without touching a filesystem.
    pub fn validate(&self) -> RecorderResult<()> {
        self.max_file_bytes()?;
        self.destination_uri()?;
        if !self.advanced.max_file_time.is_finite() {
            return Err(RecorderError::Config(format!(
                "max_file_time {} is not finite",
                self.advanced.max_file_time
            )));
        }
        Ok(())
    }
}

/// Parse a size string such as `10B`, `1.5MB` or `UNLIMITED`.
///
/// Units step by 1024 and are case-insensitive. Empty, `UNLIMITED` and
/// zero mean no limit.
pub fn parse_max_file_size(text: &str) -> RecorderResult<Option<u64>> {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() || upper == "UNLIMITED" {
        return Ok(None);
    }
    let (number, multiplier) = [("GB", 1u64 << 30), ("MB", 1 << 20), ("KB", 1 << 10), ("B", 1)]
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((upper.as_str(), 1));
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| RecorderError::Config(format!("invalid max_file_size '{text}'")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(RecorderError::Config(format!(
            "invalid max_file_size '{text}'"
        )));
    }
    let bytes = (value * multiplier as f64) as u64;
    Ok((bytes > 0).then_some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigrec_storage::InMemoryFileSystem;

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_max_file_size("10B").unwrap(), Some(10));
        assert_eq!(parse_max_file_size("10").unwrap(), Some(10));
        assert_eq!(parse_max_file_size("2kb").unwrap(), Some(2048));
        assert_eq!(parse_max_file_size("1.5MB").unwrap(), Some(1_572_864));
        assert_eq!(parse_max_file_size("1GB").unwrap(), Some(1 << 30));
        assert_eq!(parse_max_file_size("unlimited").unwrap(), None);
        assert_eq!(parse_max_file_size("").unwrap(), None);
        assert_eq!(parse_max_file_size("0").unwrap(), None);
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        for bad in ["ten", "10TB", "-5KB", "KB"] {
            assert!(
                matches!(parse_max_file_size(bad), Err(RecorderError::Config(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_defaults_from_empty_json() {
        let config = RecorderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert_eq!(config.advanced.existing_file, ExistingFilePolicy::Rename);
        assert_eq!(config.advanced.open_file_extension, "inProgress");
        assert!(config.advanced.reset_on_retune);
    }

    #[test]
    fn test_enum_spellings() {
        let config = RecorderConfig::from_json_str(
            r#"{
                "file_format": "BLUEFILE",
                "input_byte_order": "big_endian",
                "advanced": { "existing_file": "APPEND", "output_filename_case": "upper" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.file_format, FileFormat::Bluefile);
        assert_eq!(config.input_byte_order, InputByteOrder::BigEndian);
        assert_eq!(config.advanced.existing_file, ExistingFilePolicy::Append);
        assert_eq!(config.advanced.output_filename_case, FilenameCase::Upper);
        assert!(!config.output_little_endian());
    }

    #[test]
    fn test_swap_flips_output_order() {
        let mut config = RecorderConfig {
            input_byte_order: InputByteOrder::LittleEndian,
            ..RecorderConfig::default()
        };
        assert!(config.output_little_endian());
        config.swap_bytes = true;
        assert!(!config.output_little_endian());
    }

    #[test]
    fn test_suffix_joins_before_parsing() {
        let config = RecorderConfig {
            destination_uri: "file:///data//rec/%STREAMID%".into(),
            destination_uri_suffix: ".%EXTENSION%".into(),
            ..RecorderConfig::default()
        };
        let uri = config.destination_uri().unwrap();
        assert_eq!(uri.to_string(), "file:///data/rec/%STREAMID%.%EXTENSION%");
    }

    #[test]
    fn test_destination_missing_without_create() {
        let fs = InMemoryFileSystem::new();
        let mut config = RecorderConfig {
            destination_uri: "/data/out/%STREAMID%".into(),
            ..RecorderConfig::default()
        };
        config.advanced.create_destination_dir = false;
        assert!(matches!(
            config.resolve_destination(&fs),
            Err(RecorderError::DestinationMissing(_))
        ));

        config.advanced.create_destination_dir = true;
        let dest = config.resolve_destination(&fs).unwrap();
        assert_eq!(dest.directory, PathBuf::from("/data/out"));
        assert_eq!(dest.template, "%STREAMID%");
        assert!(fs.exists(Path::new("/data/out")));
    }

    #[test]
    fn test_remote_destination_uses_fallback_root() {
        let fs = InMemoryFileSystem::new();
        let config = RecorderConfig {
            destination_uri: "sca:///captures/%STREAMID%".into(),
            fallback_root: PathBuf::from("/var/sigrec"),
            ..RecorderConfig::default()
        };
        let dest = config.resolve_destination(&fs).unwrap();
        assert_eq!(dest.directory, PathBuf::from("/var/sigrec/captures"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, r#"{"component_name":"rx1","swap_bytes":true}"#).unwrap();
        let config = RecorderConfig::from_json_file(&path).unwrap();
        assert_eq!(config.component_name, "rx1");
        assert!(config.swap_bytes);
    }
}
