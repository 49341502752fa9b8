// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! sigrec: record a JSON-lines packet capture to RAW or BLUE files.
//!
//! A blocking reader task parses the capture and routes each packet to the
//! channel of its element type. The dispatch loop polls every channel once
//! per pass and sleeps only when a pass found nothing. Open files are
//! finalized before exit, also when the capture cannot be read.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sigrec_recorder::{
    CaptureReader, ChannelSink, ElementType, Packet, PacketSource, Recorder, RecorderConfig,
    RecorderError, RecorderHandle, RecorderResult, SinkMessage,
};
use sigrec_storage::{LocalFileSystem, MetricsFileSystem};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// Record a JSON-lines packet capture.
#[derive(Parser, Debug)]
#[command(name = "sigrec", version = VERSION, about = "Streaming signal recorder")]
struct Cli {
    /// Recorder configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Packet capture, one JSON packet per line. `-` reads standard input.
    #[arg(long)]
    input: PathBuf,

    /// Back-off between dispatch passes that found no packets.
    #[arg(long, default_value_t = 10)]
    idle_ms: u64,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SIGREC_LOG_FORMAT").is_ok_and(|format| format == "json");
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

// ---------------------------------------------------------------------------
// Capture reader
// ---------------------------------------------------------------------------

fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if path.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Route every packet of the capture to its element type's channel.
/// Returns the number of packets sent.
fn read_capture(path: &Path, senders: &[UnboundedSender<Packet>]) -> RecorderResult<usize> {
    let mut reader = CaptureReader::new(open_input(path)?);
    let mut sent = 0;
    while let Some(result) = reader.next() {
        let packet = match result {
            Ok(packet) => packet,
            Err(RecorderError::Io(e)) => return Err(e.into()),
            Err(e) => {
                warn!(line = reader.line(), error = %e, "Skipping capture line");
                continue;
            }
        };
        let port = ElementType::ALL
            .iter()
            .position(|t| *t == packet.element_type())
            .unwrap_or_default();
        if senders[port].send(packet).is_err() {
            debug!("Dispatch loop stopped, ending capture read");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

async fn log_events(mut rx: UnboundedReceiver<SinkMessage>) {
    while let Some(message) = rx.recv().await {
        match message {
            SinkMessage::File(event) => info!(
                operation = ?event.operation,
                stream_id = %event.stream_id,
                file = %event.filename,
                "File event"
            ),
            SinkMessage::Completed(done) => info!(
                stream_id = %done.stream_id,
                file = %done.filename,
                twsec = done.timestamp.twsec,
                "Completed file"
            ),
            SinkMessage::Sri(sri) => debug!(
                stream_id = %sri.stream_id,
                xdelta = sri.xdelta,
                mode = sri.mode,
                keywords = sri.keywords.len(),
                "SRI update"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RecorderConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => RecorderConfig::default(),
    };
    record(config, cli.input, Duration::from_millis(cli.idle_ms)).await
}

/// Record `input` until it ends, fails or Ctrl-C arrives. Open files are
/// finalized in every case before a capture error is returned.
async fn record(config: RecorderConfig, input: PathBuf, idle: Duration) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let events = tokio::spawn(log_events(event_rx));
    let recorder = Recorder::new(
        MetricsFileSystem::new(LocalFileSystem::new()),
        config,
        Box::new(ChannelSink::new(event_tx)),
    )
    .context("starting recorder")?;
    let handle = RecorderHandle::new(recorder);

    let (senders, mut receivers): (Vec<_>, Vec<_>) = ElementType::ALL
        .iter()
        .map(|_| mpsc::unbounded_channel::<Packet>())
        .unzip();
    info!(input = %input.display(), "Recording capture");
    let reader = tokio::task::spawn_blocking(move || read_capture(&input, &senders));

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    loop {
        if interrupted.load(Ordering::SeqCst) {
            warn!("Interrupted, finalizing open files");
            break;
        }
        let input_done = reader.is_finished();
        let mut sources: Vec<&mut dyn PacketSource> = receivers
            .iter_mut()
            .map(|rx| rx as &mut dyn PacketSource)
            .collect();
        if handle.service(&mut sources)? {
            continue;
        }
        if input_done {
            break;
        }
        tokio::time::sleep(idle).await;
    }

    drop(receivers);
    let capture = if reader.is_finished() {
        let result = reader
            .await
            .context("capture reader panicked")
            .and_then(|read| read.context("reading capture"));
        match &result {
            Ok(packets) => info!(packets, "Capture read"),
            Err(e) => error!(error = %format!("{e:#}"), "Capture ended early"),
        }
        result.map(|_| ())
    } else {
        Ok(())
    };

    let closed = handle.shutdown()?;
    let stats = handle.with(|recorder| recorder.filesystem().stats())?;
    info!(
        closed,
        opens = stats.open_count,
        writes = stats.write_count,
        flushes = stats.flush_count,
        bytes = stats.bytes_written,
        write_ms = stats.write_latency_sum_ms,
        "Recorder finished"
    );

    drop(handle);
    events.await.context("event logger panicked")?;
    capture
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigrec_recorder::FileFormat;

    const GOOD_LINE: &[u8] = br#"{"sri":{"stream_id":"rx","xdelta":0.001},"timestamp":{"twsec":10},"data":{"type":"short","samples":[1,2]}}"#;

    fn write_capture(dir: &Path, tail: &[u8]) -> PathBuf {
        let path = dir.join("capture.jsonl");
        let mut bytes = GOOD_LINE.to_vec();
        bytes.push(b'\n');
        bytes.extend_from_slice(tail);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn bluefile_config(out: &Path) -> RecorderConfig {
        RecorderConfig {
            destination_uri: format!("{}/%STREAMID%", out.display()),
            file_format: FileFormat::Bluefile,
            ..RecorderConfig::default()
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_read_capture_fails_on_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_capture(dir.path(), b"\xff\xfe\n");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let senders: Vec<_> = ElementType::ALL.iter().map(|_| tx.clone()).collect();

        assert!(matches!(read_capture(&input, &senders), Err(RecorderError::Io(_))));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_capture_error_still_finalizes_open_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_capture(dir.path(), b"\xff\xfe\n");
        let out = dir.path().join("out");

        let result = record(bluefile_config(&out), input, Duration::from_millis(1)).await;

        assert!(result.is_err());
        assert_eq!(file_names(&out), ["rx"]);
        let data = std::fs::read(out.join("rx")).unwrap();
        assert_eq!(&data[..4], b"BLUE");
        assert!(data.len() >= 512 + 4);
    }

    #[tokio::test]
    async fn test_clean_capture_records_and_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_capture(dir.path(), b"");
        let out = dir.path().join("out");

        record(bluefile_config(&out), input, Duration::from_millis(1))
            .await
            .unwrap();

        assert_eq!(file_names(&out), ["rx"]);
    }
}
