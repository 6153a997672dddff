//! Property and scenario tests for `CapturedStreamParser`.

use proptest::prelude::*;
use sofia_stream::{CapturedStreamParser, ChunkKind, ChunkSink};

/// A sink that records the final assembled payload per chunk, using the
/// caller-known chunk sizes to know when a payload is complete.
struct SizeTrackingSink {
    target_sizes: std::collections::VecDeque<(ChunkKind, usize)>,
    current: Vec<u8>,
    current_kind: Option<ChunkKind>,
    delivered: Vec<(ChunkKind, usize)>,
}

impl SizeTrackingSink {
    fn new(plan: Vec<(ChunkKind, usize)>) -> Self {
        Self {
            target_sizes: plan.into(),
            current: Vec::new(),
            current_kind: None,
            delivered: Vec::new(),
        }
    }

    fn record(&mut self, kind: ChunkKind, bytes: &[u8]) {
        if self.current_kind != Some(kind) && !self.current.is_empty() {
            panic!("chunk kind changed mid-payload");
        }
        self.current_kind = Some(kind);
        self.current.extend_from_slice(bytes);

        let (expected_kind, expected_len) =
            *self.target_sizes.front().expect("no more chunks expected");
        assert_eq!(kind, expected_kind, "chunk kind mismatch");
        assert!(self.current.len() <= expected_len, "payload overran expected size");

        if self.current.len() == expected_len {
            self.delivered.push((kind, expected_len));
            self.target_sizes.pop_front();
            self.current.clear();
            self.current_kind = None;
        }
    }
}

impl ChunkSink for SizeTrackingSink {
    fn on_i_frame(&mut self, bytes: &[u8]) {
        self.record(ChunkKind::IFrame, bytes);
    }

    fn on_p_frame(&mut self, bytes: &[u8]) {
        self.record(ChunkKind::PFrame, bytes);
    }

    fn on_audio(&mut self, bytes: &[u8]) {
        self.record(ChunkKind::Audio, bytes);
    }

    fn on_metadata(&mut self, bytes: &[u8]) {
        self.record(ChunkKind::Metadata, bytes);
    }
}

fn encode_i_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = ChunkKind::I_FRAME_MAGIC.to_le_bytes().to_vec();
    out.extend_from_slice(&[1, 25, 2, 2]);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn encode_p_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = ChunkKind::P_FRAME_MAGIC.to_le_bytes().to_vec();
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// S6: one 17342-byte I-frame followed by three P-frames (512/611/498 bytes),
/// fed through the parser in chunks of size 1, 7, 999, and `usize::MAX`
/// (i.e. the whole remaining buffer at once); observe callbacks delivering
/// exactly those payload sizes, in that order.
#[test]
fn s6_media_demux_scenario() {
    let i_frame_payload = vec![0xAB_u8; 17_342];
    let p_frame_payloads = [vec![0x11_u8; 512], vec![0x22_u8; 611], vec![0x33_u8; 498]];

    let mut wire = Vec::new();
    wire.extend(encode_i_frame(&i_frame_payload));
    for payload in &p_frame_payloads {
        wire.extend(encode_p_frame(payload));
    }

    let plan = vec![
        (ChunkKind::IFrame, 17_342),
        (ChunkKind::PFrame, 512),
        (ChunkKind::PFrame, 611),
        (ChunkKind::PFrame, 498),
    ];

    for chunk_size in [1usize, 7, 999, usize::MAX] {
        let mut parser = CapturedStreamParser::new();
        let mut sink = SizeTrackingSink::new(plan.clone());

        let mut offset = 0;
        while offset < wire.len() {
            let end = (offset + chunk_size).min(wire.len());
            parser.feed(&wire[offset..end], &mut sink).expect("valid chunk stream");
            offset = end;
        }

        assert_eq!(sink.delivered, plan, "mismatch at chunk_size={chunk_size}");
        assert!(!parser.has_leftover_data());
    }
}

proptest! {
    #[test]
    fn split_feed_matches_whole_feed(
        i_frame_len in 0usize..4096,
        p_frame_len in 0usize..4096,
        split_at in 0usize..8192,
    ) {
        let mut wire = Vec::new();
        wire.extend(encode_i_frame(&vec![0xCD_u8; i_frame_len]));
        wire.extend(encode_p_frame(&vec![0xEF_u8; p_frame_len]));

        let plan = vec![(ChunkKind::IFrame, i_frame_len), (ChunkKind::PFrame, p_frame_len)];

        let split = split_at.min(wire.len());
        let (head, tail) = wire.split_at(split);

        let mut parser = CapturedStreamParser::new();
        let mut sink = SizeTrackingSink::new(plan.clone());
        parser.feed(head, &mut sink).expect("valid head");
        parser.feed(tail, &mut sink).expect("valid tail");

        prop_assert_eq!(sink.delivered, plan);
        prop_assert!(!parser.has_leftover_data());
    }
}
