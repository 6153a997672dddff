//! Integration-level property tests for frame encoding and streaming decode.
//!
//! Unit-level round-trip proptests already live next to `FrameHeader` and
//! `Frame`; this file covers the cross-cutting guarantee that a sequence of
//! frames survives being split at an arbitrary byte offset and fed to
//! [`FrameDecoder`] in two pieces, plus the JSON payload trailer handling.

use bytes::Bytes;
use proptest::prelude::*;
use sofia_proto::{decode_json_payload, encode_json_payload, Frame, FrameDecoder, MsgType};

fn arbitrary_msg_type() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(MsgType::LOGIN_REQ.code()),
        Just(MsgType::LOGIN_RSP.code()),
        Just(MsgType::KEEPALIVE_REQ.code()),
        Just(MsgType::SYSINFO_RSP.code()),
        Just(MsgType::CONFIG_RSP.code()),
        Just(MsgType::SNAP_RSP.code()),
        Just(MsgType::MONITOR_RSP.code()),
        any::<u16>(),
    ]
}

proptest! {
    #[test]
    fn split_stream_yields_identical_frame_sequence(
        frames_spec in prop::collection::vec(
            (any::<u32>(), arbitrary_msg_type(), prop::collection::vec(any::<u8>(), 0..512)),
            0..16,
        ),
        split_at in 0usize..8192,
    ) {
        let mut wire = Vec::new();
        let mut expected = Vec::new();
        for (idx, (session_id, msg_type, payload)) in frames_spec.into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let sequence = idx as u32;
            let frame = Frame::new(session_id, sequence, msg_type, payload);
            frame.encode(&mut wire);
            expected.push(frame);
        }

        let split = split_at.min(wire.len());
        let (head, tail) = wire.split_at(split);

        let mut decoder = FrameDecoder::new();
        let mut observed = Vec::new();
        decoder.feed(head);
        while let Some(frame) = decoder.next_frame().expect("valid frame") {
            observed.push(frame);
        }
        decoder.feed(tail);
        while let Some(frame) = decoder.next_frame().expect("valid frame") {
            observed.push(frame);
        }

        prop_assert_eq!(observed, expected);
        prop_assert!(!decoder.has_leftover_data());
    }

    #[test]
    fn json_payload_round_trips_through_a_frame(
        ret in any::<i32>(),
        name in "[a-zA-Z0-9]{0,16}",
    ) {
        let body = serde_json::json!({ "Ret": ret, "Name": name });
        let payload = encode_json_payload(&body).expect("encode json payload");
        let frame = Frame::new(0x1234, 7, MsgType::CONFIG_RSP.code(), payload);

        let mut wire = Vec::new();
        frame.encode(&mut wire);
        let decoded_frame = Frame::decode(&wire).expect("decode frame");

        let decoded: serde_json::Value =
            decode_json_payload(&decoded_frame.payload).expect("decode json payload");
        prop_assert_eq!(decoded["Ret"].clone(), ret);
        prop_assert_eq!(decoded["Name"].clone(), name);
    }
}

#[test]
fn decoder_handles_many_small_frames_fed_one_byte_at_a_time() {
    let mut wire = Vec::new();
    let mut expected = Vec::new();
    for i in 0..64u32 {
        let frame = Frame::new(0xAA, i, MsgType::KEEPALIVE_RSP.code(), Bytes::from_static(b"{}\n\0"));
        frame.encode(&mut wire);
        expected.push(frame);
    }

    let mut decoder = FrameDecoder::new();
    let mut observed = Vec::new();
    for byte in &wire {
        decoder.feed(std::slice::from_ref(byte));
        while let Some(frame) = decoder.next_frame().expect("valid frame") {
            observed.push(frame);
        }
    }

    assert_eq!(observed, expected);
    assert!(!decoder.has_leftover_data());
}

#[test]
fn decoder_reports_leftover_data_on_truncated_stream() {
    let frame = Frame::new(1, 1, MsgType::SNAP_RSP.code(), vec![7u8; 128]);
    let mut wire = Vec::new();
    frame.encode(&mut wire);

    let mut decoder = FrameDecoder::new();
    decoder.feed(&wire[..wire.len() - 10]);
    assert_eq!(decoder.next_frame().expect("no error on partial frame"), None);
    assert!(decoder.has_leftover_data());
}
