// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the recorder

use proptest::prelude::*;
use sigrec_recorder::{
    KeywordTable, KeywordValue, MemorySink, Packet, Recorder, RecorderConfig, SampleBuffer, Sri,
    TimerEntry, TimerGate, Timestamp,
};
use sigrec_storage::InMemoryFileSystem;

fn recorder(max_file_size: &str) -> (Recorder<InMemoryFileSystem>, InMemoryFileSystem) {
    let mut config = RecorderConfig {
        destination_uri: "/rec/%STREAMID%".into(),
        ..RecorderConfig::default()
    };
    config.advanced.max_file_size = max_file_size.to_string();
    let fs = InMemoryFileSystem::new();
    let rec = Recorder::new(fs.clone(), config, Box::new(MemorySink::new())).unwrap();
    (rec, fs)
}

proptest! {
    /// Rolling over at the size cap loses and duplicates nothing: the files
    /// concatenate to the input, and every file but the last is full.
    #[test]
    fn prop_size_cap_conserves_bytes(
        cap in 1usize..64,
        sizes in prop::collection::vec(0usize..100, 1..8),
    ) {
        let (mut rec, fs) = recorder(&format!("{cap}B"));
        let mut input = Vec::new();
        let last = sizes.len() - 1;
        for (i, size) in sizes.iter().enumerate() {
            let data: Vec<u8> = (0..*size).map(|b| (input.len() + b) as u8).collect();
            input.extend_from_slice(&data);
            let packet = Packet::new(
                Sri::new("s"),
                Timestamp::new(i as f64, 0.0),
                SampleBuffer::Octet(data),
            )
            .with_eos(i == last);
            rec.process(packet);
        }
        prop_assert_eq!(rec.lifecycle().open_file_count(), 0);

        // Numbered names sort after the bare one but not numerically.
        let mut files: Vec<(usize, Vec<u8>)> = fs
            .paths()
            .into_iter()
            .map(|path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                let n = name.strip_prefix("s-").map_or(0, |n| n.parse().unwrap());
                (n, fs.contents(&path).unwrap())
            })
            .collect();
        files.sort_by_key(|(n, _)| *n);

        let joined: Vec<u8> = files.iter().flat_map(|(_, bytes)| bytes.clone()).collect();
        prop_assert_eq!(joined, input);
        for (_, bytes) in &files[..files.len().saturating_sub(1)] {
            prop_assert_eq!(bytes.len(), cap);
        }
        if let Some((_, bytes)) = files.last() {
            prop_assert!(bytes.len() <= cap);
        }
    }

    /// The gate state after a packet is the flag of the last entry at or
    /// before the packet's time.
    #[test]
    fn prop_timer_gate_follows_last_crossed_entry(
        entries in prop::collection::vec((any::<bool>(), 0u32..100), 0..10),
        mut times in prop::collection::vec(0u32..120, 1..20),
    ) {
        times.sort_unstable();
        let timers: Vec<TimerEntry> = entries
            .iter()
            .map(|(enable, t)| TimerEntry::at_packet_time(*enable, f64::from(*t), 0.0))
            .collect();
        let mut gate = TimerGate::new(true);
        gate.configure(&timers);

        let mut sorted = entries.clone();
        sorted.sort_by_key(|(_, t)| *t);
        for time in times {
            let expected = sorted
                .iter()
                .rev()
                .find(|(_, t)| *t <= time)
                .map_or(true, |(enable, _)| *enable);
            let now = Timestamp::new(0.0, 0.0);
            prop_assert_eq!(gate.evaluate(&Timestamp::new(f64::from(time), 0.0), &now), expected);
        }
    }

    /// Every keyword lands in the packed extended header, which fills whole
    /// 512-byte blocks.
    #[test]
    fn prop_keyword_table_packs_aligned(
        values in prop::collection::btree_map("[A-Z][A-Z_]{0,12}", any::<i32>(), 0..12),
    ) {
        let mut sri = Sri::new("s");
        for (id, value) in &values {
            sri.set_keyword(id.clone(), KeywordValue::Long(*value));
        }
        let table = KeywordTable::from_sri(&sri);
        let region = table
            .to_extended_header()
            .pack(sigrec_bluefile::ByteOrder::Ieee)
            .unwrap();
        prop_assert_eq!(region.len() % 512, 0);
        let entries = sigrec_bluefile::ExtendedHeader::unpack(&region, sigrec_bluefile::ByteOrder::Ieee)
            .unwrap();
        prop_assert_eq!(entries.len(), values.len());
    }
}
