// SPDX-License-Identifier: PMPL-1.0-or-later
//
// SigRec Recorder crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Records streams of typed sample packets to RAW or BLUE files. Each packet
// carries a timestamp and its stream's SRI (signal recording information:
// sample spacing, mode and typed keywords). The recorder decides per stream
// when to open, roll and close files, and keeps an optional XML metadata
// sidecar next to each data file.
//
// # Architecture
//
// ```text
// PacketSource --> Recorder::service / process
//                    |-- TimerGate          enable/disable schedule
//                    |-- FileLifecycle      stream index, FileRecords, limits
//                    |     |-- naming       filename templates and policies
//                    |     |-- header       BLUE header on open and close
//                    |     `-- sidecar      metadata XML fragments
//                    `-- RecorderSink       OPEN/CLOSE, completed files, SRI
//                  FileSystem (sigrec-storage)
// ```
//
// ## Usage
//
// ```
// use std::path::Path;
// use sigrec_recorder::{
//     MemorySink, Packet, Recorder, RecorderConfig, SampleBuffer, Sri, Timestamp,
// };
// use sigrec_storage::InMemoryFileSystem;
//
// let fs = InMemoryFileSystem::new();
// let config = RecorderConfig {
//     destination_uri: "/captures/%STREAMID%.%EXTENSION%".into(),
//     ..RecorderConfig::default()
// };
// let mut recorder = Recorder::new(fs.clone(), config, Box::new(MemorySink::new())).unwrap();
//
// let packet = Packet::new(
//     Sri::new("rx1").with_xdelta(1e-3),
//     Timestamp::new(1_700_000_000.0, 0.0),
//     SampleBuffer::Short(vec![1, 2, 3, 4]),
// )
// .with_eos(true);
// recorder.process(packet);
//
// assert_eq!(fs.contents(Path::new("/captures/rx1.raw")).unwrap().len(), 8);
// ```

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod header;
pub mod keywords;
pub mod lifecycle;
pub mod naming;
pub mod packet;
pub mod recorder;
pub mod sidecar;
pub mod sri;
pub mod timer;

pub use capture::{CaptureReader, PacketRecord};
pub use config::{
    parse_max_file_size, AdvancedProperties, Destination, ExistingFilePolicy, FileFormat,
    InputByteOrder, RecorderConfig, DEFAULT_DESTINATION_URI,
};
pub use dispatch::PacketSource;
pub use error::{RecorderError, RecorderResult};
pub use events::{
    ChannelSink, CompletedFile, FileEvent, FileOperation, MemorySink, NullSink, RecorderSink,
    SinkMessage,
};
pub use keywords::KeywordTable;
pub use lifecycle::{
    CloseOutcome, FileDecision, FileLifecycle, FileRecord, LifecycleSettings, WriteOutcome,
};
pub use naming::FilenameCase;
pub use packet::{ElementType, Packet, SampleBuffer};
pub use recorder::{Recorder, RecorderHandle};
pub use sri::{Keyword, KeywordValue, Sri, Timestamp};
pub use timer::{ClockSource, TimerEntry, TimerGate};
