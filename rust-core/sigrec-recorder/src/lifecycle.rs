// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - File lifecycle manager
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracks which file each stream writes to and owns the per-file state.
//
//   stream index:  effective stream id -> final filename
//   record table:  final filename      -> FileRecord
//
// A record lives from its first successful open until its last writer
// closes it. Several streams may share one record; the file is finalized
// when the writer count reaches zero. A stream whose file was closed at its
// size cap without reset keeps its index entry and no record, and its
// packets are dropped until end of stream.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use sigrec_bluefile::{ByteOrder, FormatCode};
use sigrec_storage::FileSystem;
use tracing::{debug, error, info, warn};

use crate::config::{Destination, ExistingFilePolicy, FileFormat, RecorderConfig};
use crate::error::{RecorderError, RecorderResult};
use crate::events::{CompletedFile, FileEvent, FileOperation, RecorderSink};
use crate::header;
use crate::keywords::KeywordTable;
use crate::naming::{render_basename, FilenameCase, NameContext};
use crate::packet::{ElementType, Packet};
use crate::sidecar;
use crate::sri::{Sri, Timestamp};

/// Highest numeric suffix tried by the rename policy.
pub const MAX_RENAME_ATTEMPTS: u32 = 1024;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Lifecycle settings derived from a validated [`RecorderConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSettings {
    pub destination: Destination,
    pub file_format: FileFormat,
    pub existing_file: ExistingFilePolicy,
    pub max_file_bytes: Option<u64>,
    pub max_file_time: f64,
    pub reset_on_max_file: bool,
    pub reset_on_retune: bool,
    pub force_flush: bool,
    pub use_hidden_files: bool,
    pub open_file_extension: String,
    pub enable_metadata_file: bool,
    pub open_metadata_file_extension: String,
    pub use_tc_prec: bool,
    pub filename_case: FilenameCase,
    pub component_name: String,
    pub output_little_endian: bool,
}

impl LifecycleSettings {
    pub fn new(config: &RecorderConfig, destination: Destination) -> RecorderResult<Self> {
        let advanced = &config.advanced;
        Ok(Self {
            destination,
            file_format: config.file_format,
            existing_file: advanced.existing_file,
            max_file_bytes: config.max_file_bytes()?,
            max_file_time: advanced.max_file_time,
            reset_on_max_file: advanced.reset_on_max_file,
            reset_on_retune: advanced.reset_on_retune,
            force_flush: advanced.force_flush,
            use_hidden_files: advanced.use_hidden_files,
            open_file_extension: advanced.open_file_extension.clone(),
            enable_metadata_file: advanced.enable_metadata_file,
            open_metadata_file_extension: advanced.open_metadata_file_extension.clone(),
            use_tc_prec: advanced.use_tc_prec,
            filename_case: advanced.output_filename_case,
            component_name: config.component_name.clone(),
            output_little_endian: config.output_little_endian(),
        })
    }

    /// Data bytes a file may hold: the smaller positive of the byte cap and
    /// the duration cap converted through the sample rate.
    pub fn size_limit(&self, sri: &Sri, element: ElementType) -> Option<u64> {
        let mut limit = self.max_file_bytes;
        if self.max_file_time > 0.0 {
            let by_time = (self.max_file_time / sri.xdelta
                * element.width() as f64
                * (f64::from(sri.mode) + 1.0)) as u64;
            if by_time > 0 && limit.map_or(true, |bytes| by_time < bytes) {
                limit = Some(by_time);
            }
        }
        limit
    }
}

/// The name a file carries while it is being written.
///
/// Hidden files get a leading dot; a non-empty extension is appended. With
/// neither, the in-process name is the final name.
pub fn in_process_name(final_path: &Path, hidden: bool, extension: &str) -> PathBuf {
    if !hidden && extension.is_empty() {
        return final_path.to_path_buf();
    }
    let base = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = if hidden { format!(".{base}") } else { base };
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    final_path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// An open metadata sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFile {
    pub filename: PathBuf,
    pub in_process: PathBuf,
    /// No `<sri>` element has been written since the sidecar was opened.
    pub needs_sri: bool,
}

/// State of one open destination file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Name the file gets when it is closed.
    pub filename: PathBuf,
    /// Name the file carries while open.
    pub in_process: PathBuf,
    pub basename: String,
    pub format: FileFormat,
    /// Effective stream id of the first writer.
    pub stream_id: String,
    pub writers: u32,
    pub last_sri: Sri,
    pub element: ElementType,
    pub format_code: FormatCode,
    /// Byte order of the samples on disk.
    pub data_rep: ByteOrder,
    pub start: Timestamp,
    pub keywords: KeywordTable,
    /// Data bytes in the file.
    pub size: u64,
    pub metadata: Option<MetadataFile>,
}

impl FileRecord {
    pub fn new(
        filename: PathBuf,
        in_process: PathBuf,
        format: FileFormat,
        stream_id: &str,
        sri: &Sri,
        element: ElementType,
    ) -> Self {
        let basename = filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            filename,
            in_process,
            basename,
            format,
            stream_id: stream_id.to_string(),
            writers: 1,
            last_sri: sri.clone(),
            element,
            format_code: element.format_code(sri.is_complex()),
            data_rep: ByteOrder::native(),
            start: Timestamp::default(),
            keywords: KeywordTable::from_sri(sri),
            size: 0,
            metadata: None,
        }
    }

    pub fn with_data_rep(mut self, data_rep: ByteOrder) -> Self {
        self.data_rep = data_rep;
        self
    }

    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = start;
        self
    }

    /// BLUE type code: 2000 for framed data, else 1000.
    pub fn type_code(&self) -> i32 {
        header::adjunct_for(&self.last_sri).type_code()
    }

    /// Adopt a new stream description.
    pub fn refresh_sri(&mut self, sri: &Sri) {
        self.last_sri = sri.clone();
        self.keywords.merge(sri);
        self.format_code = self.element.format_code(sri.is_complex());
    }
}

// ---------------------------------------------------------------------------
// Decisions and outcomes
// ---------------------------------------------------------------------------

/// What `resolve` found for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDecision {
    /// No file is open; the next write opens one.
    NoFile,
    /// Keep writing to this file.
    Continue(PathBuf),
    /// The file hit its size cap; drop packets until end of stream.
    Capped,
    /// The signal was retuned; the old file was closed.
    Retuned,
}

/// Result of one bounded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    /// The file is full and must be closed.
    pub reached_limit: bool,
}

/// Result of closing a stream's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The last writer left and the file was finalized.
    Closed,
    /// Other writers keep the file open.
    StillShared,
    /// Nothing was open.
    AlreadyClosed,
}

// ---------------------------------------------------------------------------
// FileLifecycle
// ---------------------------------------------------------------------------

/// Opens, writes, shares and finalizes destination files.
#[derive(Debug)]
pub struct FileLifecycle<F: FileSystem> {
    fs: F,
    settings: LifecycleSettings,
    index: HashMap<String, PathBuf>,
    records: BTreeMap<PathBuf, FileRecord>,
}

impl<F: FileSystem> FileLifecycle<F> {
    pub fn new(fs: F, settings: LifecycleSettings) -> Self {
        Self {
            fs,
            settings,
            index: HashMap::new(),
            records: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Replace the settings. Open files keep the names they were given.
    pub fn set_settings(&mut self, settings: LifecycleSettings) {
        self.settings = settings;
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// The final filename a stream is writing to.
    pub fn file_for(&self, stream_id: &str) -> Option<&Path> {
        self.index.get(stream_id).map(PathBuf::as_path)
    }

    pub fn record(&self, filename: &Path) -> Option<&FileRecord> {
        self.records.get(filename)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    pub fn open_file_count(&self) -> usize {
        self.records.len()
    }

    /// Decide what to do with a stream's current file before writing.
    ///
    /// With retune detection on, a change of sample spacing, mode or centre
    /// frequency closes the current file and forgets it.
    pub fn resolve(
        &mut self,
        stream_id: &str,
        sri: &Sri,
        timestamp: &Timestamp,
        sink: &mut dyn RecorderSink,
    ) -> FileDecision {
        let Some(filename) = self.index.get(stream_id).cloned() else {
            return FileDecision::NoFile;
        };
        let Some(record) = self.records.get(&filename) else {
            return FileDecision::Capped;
        };
        if self.settings.reset_on_retune && record.last_sri.is_retuned(sri) {
            info!(
                stream_id = %stream_id,
                file = %filename.display(),
                old_xdelta = record.last_sri.xdelta,
                new_xdelta = sri.xdelta,
                "Stream retuned, closing file"
            );
            self.close(stream_id, timestamp, sink);
            self.index.remove(stream_id);
            return FileDecision::Retuned;
        }
        FileDecision::Continue(filename)
    }

    /// Return the stream's open file, opening one when none is indexed.
    pub fn open_or_continue(
        &mut self,
        stream_id: &str,
        packet: &Packet,
        sink: &mut dyn RecorderSink,
    ) -> RecorderResult<&mut FileRecord> {
        if let Some(filename) = self.index.get(stream_id) {
            return self
                .records
                .get_mut(filename)
                .ok_or_else(|| RecorderError::Capped(stream_id.to_string()));
        }

        let filename = self.target_filename(stream_id, packet)?;
        let created = !self.records.contains_key(&filename);
        if created {
            let record = self.create_record(stream_id, packet, &filename)?;
            self.records.insert(filename.clone(), record);
        } else if let Some(record) = self.records.get_mut(&filename) {
            record.writers += 1;
            record.refresh_sri(&packet.sri);
            debug!(
                stream_id = %stream_id,
                file = %filename.display(),
                writers = record.writers,
                "Joined shared file"
            );
        }

        if let Err(e) = self.open_sidecar(&filename) {
            self.abandon(&filename, created);
            return Err(e);
        }
        if created {
            sink.file_event(FileEvent {
                operation: FileOperation::Open,
                stream_id: stream_id.to_string(),
                filename: filename.display().to_string(),
            });
            info!(stream_id = %stream_id, file = %filename.display(), "Opened recording file");
        }

        self.index.insert(stream_id.to_string(), filename.clone());
        self.records
            .get_mut(&filename)
            .ok_or_else(|| RecorderError::NoFile(stream_id.to_string()))
    }

    /// Adopt a changed stream description on the stream's open file.
    pub fn update_sri(&mut self, stream_id: &str, sri: &Sri) {
        if let Some(record) = self
            .index
            .get(stream_id)
            .and_then(|filename| self.records.get_mut(filename))
        {
            record.refresh_sri(sri);
        }
    }

    /// Write `bytes[offset..]`, or as much of it as fits under the size cap.
    pub fn write(&mut self, stream_id: &str, bytes: &[u8], offset: usize) -> RecorderResult<WriteOutcome> {
        let filename = self
            .index
            .get(stream_id)
            .ok_or_else(|| RecorderError::NoFile(stream_id.to_string()))?;
        let record = self
            .records
            .get_mut(filename)
            .ok_or_else(|| RecorderError::Capped(stream_id.to_string()))?;

        let offset = offset.min(bytes.len());
        let remaining = bytes.len() - offset;
        let mut len = remaining;
        let mut reached_limit = false;
        if let Some(limit) = self.settings.size_limit(&record.last_sri, record.element) {
            let room = limit.saturating_sub(record.size);
            if room <= remaining as u64 {
                len = room as usize;
                reached_limit = true;
            }
        }

        self.fs
            .write(&record.in_process, &bytes[offset..offset + len], self.settings.force_flush)?;
        record.size += len as u64;
        debug!(
            stream_id = %stream_id,
            file = %record.in_process.display(),
            bytes = len,
            total = record.size,
            reached_limit,
            "Wrote packet data"
        );
        Ok(WriteOutcome {
            written: len,
            reached_limit,
        })
    }

    /// Record one written fragment in the stream's sidecar, preceded by the
    /// SRI when the sidecar is new or the SRI changed.
    ///
    /// `offset` is where the fragment started within the packet; the
    /// fragment's time code is advanced past the samples before it.
    pub fn write_metadata(
        &mut self,
        stream_id: &str,
        packet: &Packet,
        offset: usize,
        written: usize,
        eos: bool,
    ) -> RecorderResult<()> {
        let Some(meta) = self
            .index
            .get(stream_id)
            .and_then(|filename| self.records.get_mut(filename))
            .and_then(|record| record.metadata.as_mut())
        else {
            return Ok(());
        };
        let force = self.settings.force_flush;

        if meta.needs_sri || packet.sri_changed {
            let xml = sidecar::sri_element(&packet.sri, packet.sri_changed);
            self.fs.write(&meta.in_process, xml.as_bytes(), force)?;
            meta.needs_sri = false;
        }

        let frame = packet.element_type().width() * packet.sri.elements_per_sample();
        let samples_before = offset / frame.max(1);
        let timecode = if samples_before > 0 {
            packet
                .timestamp
                .advanced_by(packet.sri.xdelta * samples_before as f64)
        } else {
            packet.timestamp
        };
        let xml = sidecar::packet_element(&packet.stream_id, written, eos, &timecode);
        self.fs.write(&meta.in_process, xml.as_bytes(), force)?;
        Ok(())
    }

    /// Drop one writer from the stream's file, finalizing it when none
    /// remain. The stream's index entry is left for the caller to remove.
    pub fn close(
        &mut self,
        stream_id: &str,
        timestamp: &Timestamp,
        sink: &mut dyn RecorderSink,
    ) -> CloseOutcome {
        let Some(filename) = self.index.get(stream_id).cloned() else {
            return CloseOutcome::AlreadyClosed;
        };
        let Some(record) = self.records.get_mut(&filename) else {
            return CloseOutcome::AlreadyClosed;
        };
        record.writers = record.writers.saturating_sub(1);
        if record.writers > 0 {
            debug!(
                stream_id = %stream_id,
                file = %filename.display(),
                writers = record.writers,
                "File still shared, keeping it open"
            );
            return CloseOutcome::StillShared;
        }
        match self.records.remove(&filename) {
            Some(record) => {
                self.finalize(record, stream_id, timestamp, sink);
                CloseOutcome::Closed
            }
            None => CloseOutcome::AlreadyClosed,
        }
    }

    /// Forget the stream's file without closing it.
    pub fn release(&mut self, stream_id: &str) -> bool {
        self.index.remove(stream_id).is_some()
    }

    /// Finalize every open file regardless of writers and clear the index.
    pub fn close_all(&mut self, timestamp: &Timestamp, sink: &mut dyn RecorderSink) -> usize {
        let records = std::mem::take(&mut self.records);
        let count = records.len();
        for record in records.into_values() {
            let stream_id = record.stream_id.clone();
            self.finalize(record, &stream_id, timestamp, sink);
        }
        self.index.clear();
        count
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Render the filename for a new file and apply the existing-file
    /// policy to it.
    fn target_filename(&self, stream_id: &str, packet: &Packet) -> RecorderResult<PathBuf> {
        let settings = &self.settings;
        let system_time = Timestamp::now();
        let data_type = packet
            .element_type()
            .data_type_code(settings.output_little_endian);
        let ctx = NameContext {
            stream_id,
            sri: &packet.sri,
            timestamp: &packet.timestamp,
            system_time: &system_time,
            component_name: &settings.component_name,
            extension: settings.file_format.extension(),
            data_type: &data_type,
        };
        let basename = settings
            .filename_case
            .apply(&render_basename(&settings.destination.template, &ctx));
        let filename = settings.destination.directory.join(basename);

        if !self.fs.exists(&filename) {
            return Ok(filename);
        }
        match settings.existing_file {
            ExistingFilePolicy::Drop => Err(RecorderError::PolicyRefused {
                path: filename,
                reason: "file exists",
            }),
            ExistingFilePolicy::Truncate => {
                if self.records.contains_key(&filename) {
                    return Err(RecorderError::PolicyRefused {
                        path: filename,
                        reason: "file is being recorded",
                    });
                }
                self.fs.delete(&filename)?;
                info!(file = %filename.display(), "Truncated existing file");
                Ok(filename)
            }
            ExistingFilePolicy::Rename => self.free_name(&filename),
            ExistingFilePolicy::Append => Ok(filename),
        }
    }

    /// First `name-N` that is neither on disk nor being recorded.
    fn free_name(&self, filename: &Path) -> RecorderResult<PathBuf> {
        for n in 1..=MAX_RENAME_ATTEMPTS {
            let mut candidate = filename.as_os_str().to_os_string();
            candidate.push(format!("-{n}"));
            let candidate = PathBuf::from(candidate);
            if !self.fs.exists(&candidate) && !self.records.contains_key(&candidate) {
                debug!(from = %filename.display(), to = %candidate.display(), "Renamed output file");
                return Ok(candidate);
            }
        }
        Err(RecorderError::PolicyRefused {
            path: filename.to_path_buf(),
            reason: "no free numbered name",
        })
    }

    fn create_record(&self, stream_id: &str, packet: &Packet, filename: &Path) -> RecorderResult<FileRecord> {
        let settings = &self.settings;
        let in_process = in_process_name(filename, settings.use_hidden_files, &settings.open_file_extension);
        let append = settings.existing_file == ExistingFilePolicy::Append && self.fs.exists(filename);
        let moved = append && in_process != filename;
        if moved {
            self.fs.move_file(filename, &in_process)?;
        }
        if let Err(source) = self.fs.open(&in_process, true, append) {
            if moved {
                if let Err(e) = self.fs.move_file(&in_process, filename) {
                    error!(file = %filename.display(), error = %e, "Could not restore file after failed open");
                }
            }
            return Err(RecorderError::OpenFailed {
                path: in_process,
                source,
            });
        }

        let start = if packet.timestamp.is_valid() {
            packet.timestamp
        } else {
            Timestamp::now()
        };
        let mut record = FileRecord::new(
            filename.to_path_buf(),
            in_process,
            settings.file_format,
            stream_id,
            &packet.sri,
            packet.element_type(),
        )
        .with_data_rep(ByteOrder::from_little_endian(settings.output_little_endian))
        .with_start(start);
        record.size = self.fs.size(&record.in_process).unwrap_or(0);

        if record.format == FileFormat::Bluefile {
            match header::prepare_blue(&self.fs, &record.in_process, true) {
                Ok(Some(data_size)) => record.size = data_size,
                Ok(None) => {}
                Err(e) => {
                    self.discard(&record);
                    return Err(e);
                }
            }
        }
        Ok(record)
    }

    /// Open the record's sidecar when sidecars are enabled and it has none.
    fn open_sidecar(&mut self, filename: &Path) -> RecorderResult<()> {
        let settings = &self.settings;
        if !settings.enable_metadata_file {
            return Ok(());
        }
        let Some(record) = self.records.get_mut(filename) else {
            return Ok(());
        };
        if record.metadata.is_some() {
            return Ok(());
        }
        let final_path = sidecar::metadata_path(&record.filename);
        let in_process = in_process_name(
            &final_path,
            settings.use_hidden_files,
            &settings.open_metadata_file_extension,
        );
        self.fs
            .open(&in_process, true, false)
            .map_err(|source| RecorderError::OpenFailed {
                path: in_process.clone(),
                source,
            })?;
        self.fs.write(
            &in_process,
            sidecar::open_tag(&record.basename).as_bytes(),
            settings.force_flush,
        )?;
        record.metadata = Some(MetadataFile {
            filename: final_path,
            in_process,
            needs_sri: true,
        });
        Ok(())
    }

    /// Undo a failed open: a new record is discarded, a shared one loses
    /// the writer it just gained.
    fn abandon(&mut self, filename: &Path, created: bool) {
        if created {
            if let Some(record) = self.records.remove(filename) {
                self.discard(&record);
            }
        } else if let Some(record) = self.records.get_mut(filename) {
            record.writers = record.writers.saturating_sub(1);
        }
    }

    /// Close a record's data file without finalizing it. An empty file is
    /// removed; one that held appended data gets its final name back.
    fn discard(&self, record: &FileRecord) {
        let result = self.fs.close(&record.in_process).and_then(|()| {
            if record.size == 0 {
                self.fs.delete(&record.in_process).map(|_| ())
            } else if record.in_process != record.filename {
                self.fs.move_file(&record.in_process, &record.filename)
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            error!(file = %record.in_process.display(), error = %e, "Could not clean up after failed open");
        }
    }

    fn finalize(
        &self,
        record: FileRecord,
        stream_id: &str,
        timestamp: &Timestamp,
        sink: &mut dyn RecorderSink,
    ) {
        // The final name is only announced once the file carries it.
        let finished = match self.finish_data(&record) {
            Ok(()) => {
                announce_close(&record, stream_id, timestamp, sink);
                true
            }
            Err(e) => {
                error!(
                    file = %record.in_process.display(),
                    target = %record.filename.display(),
                    error = %e,
                    "Failed to finalize data file"
                );
                false
            }
        };

        if let Some(meta) = &record.metadata {
            if let Err(e) = self.finish_metadata(meta) {
                error!(file = %meta.filename.display(), error = %e, "Failed to finalize metadata file");
            }
        }
        if finished {
            info!(
                stream_id = %stream_id,
                file = %record.filename.display(),
                bytes = record.size,
                "Closed recording file"
            );
        }
    }

    fn finish_data(&self, record: &FileRecord) -> RecorderResult<()> {
        if record.format == FileFormat::Bluefile {
            header::finalize_blue(
                &self.fs,
                record,
                self.settings.use_tc_prec,
                self.settings.force_flush,
            )?;
        }
        self.fs.close(&record.in_process)?;
        if record.in_process != record.filename {
            self.fs.move_file(&record.in_process, &record.filename)?;
        }
        Ok(())
    }

    fn finish_metadata(&self, meta: &MetadataFile) -> RecorderResult<()> {
        self.fs.write(
            &meta.in_process,
            sidecar::CLOSE_TAG.as_bytes(),
            self.settings.force_flush,
        )?;
        self.fs.close(&meta.in_process)?;
        if meta.in_process != meta.filename {
            self.fs.move_file(&meta.in_process, &meta.filename)?;
        }
        Ok(())
    }
}

/// Publish CLOSE and the completed-file notice for a finalized record.
fn announce_close(record: &FileRecord, stream_id: &str, timestamp: &Timestamp, sink: &mut dyn RecorderSink) {
    let filename = record.filename.display().to_string();
    sink.file_event(FileEvent {
        operation: FileOperation::Close,
        stream_id: stream_id.to_string(),
        filename: filename.clone(),
    });
    sink.completed_file(CompletedFile {
        filename,
        timestamp: if timestamp.is_valid() {
            *timestamp
        } else {
            Timestamp::now()
        },
        eos: true,
        stream_id: stream_id.to_string(),
    });
}

impl<F: FileSystem> Drop for FileLifecycle<F> {
    fn drop(&mut self) {
        if !self.records.is_empty() {
            warn!(open = self.records.len(), "Lifecycle dropped with files still open");
        }
    }
}
