// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the SigRec header codec and write path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sigrec_bluefile::{
    Adjunct, Axis, BlueKeyword, BlueValue, ByteOrder, DataMode, ElementFormat, ExtendedHeader,
    FormatCode, HeaderControlBlock,
};
use sigrec_recorder::{
    MemorySink, NullSink, Packet, Recorder, RecorderConfig, SampleBuffer, Sri, Timestamp,
};
use sigrec_storage::InMemoryFileSystem;

// ============================================================================
// Header Codec Benchmarks
// ============================================================================

fn extended_header(keywords: usize) -> ExtendedHeader {
    let mut ext = ExtendedHeader::new();
    for i in 0..keywords {
        let value = match i % 3 {
            0 => BlueValue::Double(i as f64 * 1.5e6),
            1 => BlueValue::Long(i as i32),
            _ => BlueValue::ascii(format!("value-{i}")).unwrap(),
        };
        ext.insert(BlueKeyword::new(format!("KEYWORD_{i:03}"), value));
    }
    ext
}

fn bench_extended_header_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("extended_header");

    for keywords in [4, 32, 256] {
        let ext = extended_header(keywords);
        group.throughput(Throughput::Elements(keywords as u64));
        group.bench_with_input(BenchmarkId::new("pack", keywords), &ext, |b, ext| {
            b.iter(|| black_box(ext.pack(ByteOrder::Ieee).unwrap()));
        });

        let region = ext.pack(ByteOrder::Ieee).unwrap();
        group.bench_with_input(BenchmarkId::new("unpack", keywords), &region, |b, region| {
            b.iter(|| black_box(ExtendedHeader::unpack(region, ByteOrder::Ieee).unwrap()));
        });
    }

    group.finish();
}

fn bench_hcb_encode(c: &mut Criterion) {
    let mut hcb = HeaderControlBlock::new(
        FormatCode::new(DataMode::Complex, ElementFormat::Float),
        Adjunct::OneD {
            x: Axis {
                start: 0.0,
                delta: 1e-6,
                units: 1,
            },
        },
    );
    hcb.data_size = 1_048_576.0;
    hcb.keywords.push(("TC_PREC".to_string(), "1.25e-7".to_string()));
    let bytes = hcb.encode().unwrap();

    let mut group = c.benchmark_group("hcb");
    group.bench_function("encode", |b| b.iter(|| black_box(hcb.encode().unwrap())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(HeaderControlBlock::decode(&bytes).unwrap()))
    });
    group.finish();
}

// ============================================================================
// Dispatch Write Path Benchmarks
// ============================================================================

fn bench_dispatch_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for samples in [256usize, 4096, 65536] {
        let packet = Packet::new(
            Sri::new("bench").with_xdelta(1e-6),
            Timestamp::new(1_700_000_000.0, 0.0),
            SampleBuffer::Short(vec![0x1234; samples]),
        );
        group.throughput(Throughput::Bytes((samples * 2) as u64));

        group.bench_with_input(BenchmarkId::new("raw", samples), &packet, |b, packet| {
            let config = RecorderConfig {
                destination_uri: "/bench/%STREAMID%".into(),
                ..RecorderConfig::default()
            };
            let mut recorder =
                Recorder::new(InMemoryFileSystem::new(), config, Box::new(NullSink)).unwrap();
            b.iter(|| recorder.process(black_box(packet.clone())));
            recorder.shutdown();
        });

        group.bench_with_input(BenchmarkId::new("swapped_with_sidecar", samples), &packet, |b, packet| {
            let mut config = RecorderConfig {
                destination_uri: "/bench/%STREAMID%".into(),
                swap_bytes: true,
                ..RecorderConfig::default()
            };
            config.advanced.enable_metadata_file = true;
            let mut recorder =
                Recorder::new(InMemoryFileSystem::new(), config, Box::new(MemorySink::new())).unwrap();
            b.iter(|| recorder.process(black_box(packet.clone())));
            recorder.shutdown();
        });
    }

    group.finish();
}

fn bench_size_cap_rollover(c: &mut Criterion) {
    let packet = Packet::new(
        Sri::new("roll"),
        Timestamp::new(1_700_000_000.0, 0.0),
        SampleBuffer::Octet(vec![0xA5; 4096]),
    );
    let mut config = RecorderConfig {
        destination_uri: "/bench/%STREAMID%".into(),
        ..RecorderConfig::default()
    };
    config.advanced.max_file_size = "1KB".into();
    config.advanced.existing_file = sigrec_recorder::ExistingFilePolicy::Truncate;

    let mut group = c.benchmark_group("rollover");
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("four_files_per_packet", |b| {
        let mut recorder =
            Recorder::new(InMemoryFileSystem::new(), config.clone(), Box::new(NullSink)).unwrap();
        b.iter(|| recorder.process(black_box(packet.clone())));
        recorder.shutdown();
    });
    group.finish();
}

criterion_group!(header_benches, bench_extended_header_pack, bench_hcb_encode);

criterion_group!(dispatch_benches, bench_dispatch_write, bench_size_cap_rollover);

criterion_main!(header_benches, dispatch_benches);
