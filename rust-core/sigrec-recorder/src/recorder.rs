// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder - Recorder owner and shared handle
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `Recorder` owns the file lifecycle, the timer gate and the event sink
// and is driven through `&mut self`. `RecorderHandle` shares one recorder
// between a dispatch task and configuration callers.

use std::sync::{Arc, Mutex, MutexGuard};

use sigrec_storage::FileSystem;
use tracing::info;

use crate::config::RecorderConfig;
use crate::dispatch::PacketSource;
use crate::error::{RecorderError, RecorderResult};
use crate::events::RecorderSink;
use crate::lifecycle::{FileLifecycle, LifecycleSettings};
use crate::packet::Packet;
use crate::sri::Timestamp;
use crate::timer::{TimerEntry, TimerGate};

/// Records packets to files according to a [`RecorderConfig`].
pub struct Recorder<F: FileSystem> {
    pub(crate) config: RecorderConfig,
    pub(crate) lifecycle: FileLifecycle<F>,
    pub(crate) gate: TimerGate,
    pub(crate) sink: Box<dyn RecorderSink>,
}

impl<F: FileSystem> Recorder<F> {
    /// Validate `config`, resolve its destination on `fs` and build a
    /// recorder with no open files.
    pub fn new(fs: F, config: RecorderConfig, sink: Box<dyn RecorderSink>) -> RecorderResult<Self> {
        config.validate()?;
        let destination = config.resolve_destination(&fs)?;
        let settings = LifecycleSettings::new(&config, destination)?;
        let mut gate = TimerGate::new(config.recording_enabled);
        gate.configure(&config.recording_timer);

        info!(
            filesystem = fs.name(),
            directory = %settings.destination.directory.display(),
            template = %settings.destination.template,
            format = ?settings.file_format,
            "Recorder started"
        );
        Ok(Self {
            config,
            lifecycle: FileLifecycle::new(fs, settings),
            gate,
            sink,
        })
    }

    /// Apply a new configuration.
    ///
    /// Nothing changes unless the whole configuration validates. A new
    /// destination or file format closes every open file.
    pub fn configure(&mut self, config: RecorderConfig) -> RecorderResult<()> {
        config.validate()?;
        let destination = config.resolve_destination(self.lifecycle.filesystem())?;
        let settings = LifecycleSettings::new(&config, destination)?;

        let current = self.lifecycle.settings();
        if settings.destination != current.destination || settings.file_format != current.file_format {
            let closed = self
                .lifecycle
                .close_all(&Timestamp::now(), self.sink.as_mut());
            info!(closed, "Destination or format changed, closed open files");
        }
        self.lifecycle.set_settings(settings);

        if config.recording_timer != self.config.recording_timer {
            self.gate.configure(&config.recording_timer);
        }
        if config.recording_enabled != self.config.recording_enabled {
            self.gate.set_enabled(config.recording_enabled);
        }
        self.config = config;
        info!("Recorder reconfigured");
        Ok(())
    }

    /// Replace the recording schedule and rewind it.
    pub fn set_timers(&mut self, entries: Vec<TimerEntry>) {
        self.gate.configure(&entries);
        self.config.recording_timer = entries;
    }

    /// Set the global recording flag. It holds until the next timer entry
    /// is crossed.
    pub fn set_recording_enabled(&mut self, enabled: bool) {
        self.gate.set_enabled(enabled);
        self.config.recording_enabled = enabled;
        info!(enabled, "Recording flag set");
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &FileLifecycle<F> {
        &self.lifecycle
    }

    pub fn gate(&self) -> &TimerGate {
        &self.gate
    }

    pub fn filesystem(&self) -> &F {
        self.lifecycle.filesystem()
    }

    /// Finalize every open file. Returns how many were closed.
    pub fn shutdown(&mut self) -> usize {
        let closed = self
            .lifecycle
            .close_all(&Timestamp::now(), self.sink.as_mut());
        info!(closed, "Recorder shut down");
        closed
    }
}

// ---------------------------------------------------------------------------
// RecorderHandle
// ---------------------------------------------------------------------------

/// A cloneable, thread-safe handle to one [`Recorder`].
pub struct RecorderHandle<F: FileSystem> {
    inner: Arc<Mutex<Recorder<F>>>,
}

impl<F: FileSystem> Clone for RecorderHandle<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: FileSystem> RecorderHandle<F> {
    pub fn new(recorder: Recorder<F>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(recorder)),
        }
    }

    fn lock(&self) -> RecorderResult<MutexGuard<'_, Recorder<F>>> {
        self.inner.lock().map_err(|_| RecorderError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the recorder.
    pub fn with<R>(&self, f: impl FnOnce(&mut Recorder<F>) -> R) -> RecorderResult<R> {
        Ok(f(&mut *self.lock()?))
    }

    pub fn process(&self, packet: Packet) -> RecorderResult<()> {
        self.lock()?.process(packet);
        Ok(())
    }

    pub fn service(&self, sources: &mut [&mut dyn PacketSource]) -> RecorderResult<bool> {
        Ok(self.lock()?.service(sources))
    }

    pub fn configure(&self, config: RecorderConfig) -> RecorderResult<()> {
        self.lock()?.configure(config)
    }

    pub fn set_recording_enabled(&self, enabled: bool) -> RecorderResult<()> {
        self.lock()?.set_recording_enabled(enabled);
        Ok(())
    }

    pub fn set_timers(&self, entries: Vec<TimerEntry>) -> RecorderResult<()> {
        self.lock()?.set_timers(entries);
        Ok(())
    }

    pub fn shutdown(&self) -> RecorderResult<usize> {
        Ok(self.lock()?.shutdown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use sigrec_storage::InMemoryFileSystem;

    use crate::config::{ExistingFilePolicy, FileFormat};
    use crate::events::MemorySink;
    use crate::packet::SampleBuffer;
    use crate::sri::Sri;

    fn config() -> RecorderConfig {
        RecorderConfig {
            destination_uri: "file:///rec/%STREAMID%.%EXTENSION%".into(),
            ..RecorderConfig::default()
        }
    }

    fn packet(stream: &str) -> Packet {
        Packet::new(
            Sri::new(stream),
            Timestamp::new(1_700_000_000.0, 0.0),
            SampleBuffer::Short(vec![1, 2, 3]),
        )
    }

    #[test]
    fn test_new_creates_destination() {
        let fs = InMemoryFileSystem::new();
        let recorder = Recorder::new(fs.clone(), config(), Box::new(MemorySink::new())).unwrap();
        assert!(fs.exists(Path::new("/rec")));
        assert_eq!(recorder.lifecycle().open_file_count(), 0);
    }

    #[test]
    fn test_new_rejects_missing_destination() {
        let mut cfg = config();
        cfg.advanced.create_destination_dir = false;
        let result = Recorder::new(InMemoryFileSystem::new(), cfg, Box::new(MemorySink::new()));
        assert!(matches!(result, Err(RecorderError::DestinationMissing(_))));
    }

    #[test]
    fn test_bad_configure_changes_nothing() {
        let fs = InMemoryFileSystem::new();
        let mut recorder = Recorder::new(fs, config(), Box::new(MemorySink::new())).unwrap();
        recorder.process(packet("a"));

        let mut bad = config();
        bad.advanced.max_file_size = "ten bytes".into();
        bad.advanced.existing_file = ExistingFilePolicy::Drop;
        assert!(matches!(recorder.configure(bad), Err(RecorderError::Config(_))));
        assert_eq!(recorder.config().advanced.existing_file, ExistingFilePolicy::Rename);
        assert_eq!(recorder.lifecycle().open_file_count(), 1);
    }

    #[test]
    fn test_format_change_closes_files() {
        let fs = InMemoryFileSystem::new();
        let sink = MemorySink::new();
        let mut recorder = Recorder::new(fs.clone(), config(), Box::new(sink.clone())).unwrap();
        recorder.process(packet("a"));

        let mut cfg = config();
        cfg.advanced.force_flush = true;
        recorder.configure(cfg.clone()).unwrap();
        assert_eq!(recorder.lifecycle().open_file_count(), 1);

        cfg.file_format = FileFormat::Bluefile;
        recorder.configure(cfg).unwrap();
        assert_eq!(recorder.lifecycle().open_file_count(), 0);
        assert_eq!(fs.contents(Path::new("/rec/a.raw")).unwrap().len(), 6);
        assert_eq!(sink.completed_files().len(), 1);
    }

    #[test]
    fn test_handle_shares_recorder() {
        let fs = InMemoryFileSystem::new();
        let handle = RecorderHandle::new(
            Recorder::new(fs.clone(), config(), Box::new(MemorySink::new())).unwrap(),
        );
        let other = handle.clone();
        handle.process(packet("a")).unwrap();
        assert_eq!(other.with(|r| r.lifecycle().open_file_count()).unwrap(), 1);
        assert_eq!(other.shutdown().unwrap(), 1);
        assert!(fs.contents(Path::new("/rec/a.raw")).is_some());
    }

    #[test]
    fn test_global_flag_disables_recording() {
        let fs = InMemoryFileSystem::new();
        let mut recorder = Recorder::new(fs.clone(), config(), Box::new(MemorySink::new())).unwrap();
        recorder.set_recording_enabled(false);
        recorder.process(packet("a"));
        assert!(fs.paths().is_empty());
        recorder.set_recording_enabled(true);
        recorder.process(packet("a"));
        assert_eq!(recorder.lifecycle().open_file_count(), 1);
    }
}
