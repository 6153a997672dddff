//! Frame type and incremental wire decoder.
//!
//! A `Frame` is the transport-layer packet: `[FrameHeader: 20 bytes] +
//! [payload: variable bytes]`. [`FrameDecoder`] consumes an append-only byte
//! stream and yields whole frames one at a time, without ever copying bytes
//! past the current frame boundary — excess bytes are carried over to the
//! next call.

use bytes::{Buf, Bytes, BytesMut};

use crate::{errors::ProtocolError, header::FrameHeader};

/// Complete protocol frame: header plus raw payload bytes.
///
/// Holds raw bytes, not a parsed JSON value — callers decide whether to treat
/// the payload as JSON (control traffic) or opaque binary (snapshot / media).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Raw payload bytes (`header.payload_len()` bytes).
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame, computing `payload_len` from the payload itself.
    #[must_use]
    pub fn new(session_id: u32, sequence: u32, msg_type: u16, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        #[allow(clippy::cast_possible_truncation)]
        let payload_len = payload.len() as u32;
        let header = FrameHeader::new(session_id, sequence, msg_type, payload_len);
        Self { header, payload }
    }

    /// Encode the frame onto `dst`: header bytes followed by the payload.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&self.header.to_bytes());
        dst.extend_from_slice(&self.payload);
    }

    /// Decode a single frame from a buffer known to hold exactly one frame's
    /// worth of bytes (header + declared payload). Prefer [`FrameDecoder`]
    /// when reading from a live socket.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the header is malformed or the buffer is
    /// shorter than the header declares.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let payload_len = header.payload_len() as usize;
        let total = FrameHeader::SIZE + payload_len;

        if bytes.len() < total {
            return Err(ProtocolError::PayloadLengthMismatch {
                declared: header.payload_len(),
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[FrameHeader::SIZE..total]);
        Ok(Self { header, payload })
    }
}

/// Decoder state, mirroring the two phases of reading one frame off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Waiting until [`FrameHeader::SIZE`] bytes are buffered.
    NeedHeader,
    /// Header parsed; waiting until `payload_len` more bytes are buffered.
    NeedBody {
        /// The already-parsed header for the frame in progress.
        header: FrameHeader,
    },
}

/// Stateful, incremental frame decoder.
///
/// Feed it bytes as they arrive from the transport via [`FrameDecoder::feed`],
/// then drain complete frames with [`FrameDecoder::next_frame`]. Splitting the
/// input stream at any byte offset and feeding the pieces across separate
/// `feed` calls produces the identical sequence of frames as feeding the
/// whole stream at once.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buffer: BytesMut,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create an empty decoder, ready to receive bytes.
    #[must_use]
    pub fn new() -> Self {
        Self { state: DecoderState::NeedHeader, buffer: BytesMut::new() }
    }

    /// Append freshly-read bytes to the decode buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes are buffered but do not yet form a complete frame.
    ///
    /// At end-of-stream this must be `false` for a clean shutdown; `true`
    /// means the peer closed mid-frame.
    #[must_use]
    pub fn has_leftover_data(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Attempt to extract the next complete frame from the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Never copies bytes past
    /// the current frame boundary; leftover bytes remain buffered for the
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BadMagic`] or [`ProtocolError::BadVersion`] if
    /// the buffered header is malformed. The decoder stays usable afterwards
    /// only if the caller resynchronizes the stream; in practice a malformed
    /// header is treated as a fatal protocol error by the session layer.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            match self.state {
                DecoderState::NeedHeader => {
                    if self.buffer.len() < FrameHeader::SIZE {
                        return Ok(None);
                    }
                    let header = FrameHeader::from_bytes(&self.buffer[..FrameHeader::SIZE])?;
                    self.buffer.advance(FrameHeader::SIZE);
                    self.state = DecoderState::NeedBody { header };
                },
                DecoderState::NeedBody { header } => {
                    let needed = header.payload_len() as usize;
                    if self.buffer.len() < needed {
                        return Ok(None);
                    }
                    let payload = self.buffer.split_to(needed).freeze();
                    self.state = DecoderState::NeedHeader;
                    return Ok(Some(Frame { header, payload }));
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample_frames() -> Vec<Frame> {
        vec![
            Frame::new(0, 0, 1000, Bytes::from_static(b"{}\n\0")),
            Frame::new(0xABCD, 1, 1042, Bytes::from_static(b"{\"Name\":\"x\"}\n\0")),
            Frame::new(0xABCD, 2, 1281, Bytes::from(vec![0u8; 4096])),
            Frame::new(0xABCD, 3, 1006, Bytes::new()),
        ]
    }

    #[test]
    fn whole_buffer_round_trip() {
        for frame in sample_frames() {
            let mut wire = Vec::new();
            frame.encode(&mut wire);
            let decoded = Frame::decode(&wire).expect("decode");
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn decoder_resumes_across_arbitrary_splits() {
        let frames = sample_frames();
        let mut wire = Vec::new();
        for frame in &frames {
            frame.encode(&mut wire);
        }

        for split in 0..=wire.len() {
            let (first, second) = wire.split_at(split);
            let mut decoder = FrameDecoder::new();
            let mut observed = Vec::new();

            decoder.feed(first);
            while let Some(frame) = decoder.next_frame().expect("valid frame") {
                observed.push(frame);
            }
            decoder.feed(second);
            while let Some(frame) = decoder.next_frame().expect("valid frame") {
                observed.push(frame);
            }

            assert_eq!(observed, frames, "split at offset {split} produced different frames");
        }
    }

    #[test]
    fn byte_at_a_time_feed_yields_same_frames() {
        let frames = sample_frames();
        let mut wire = Vec::new();
        for frame in &frames {
            frame.encode(&mut wire);
        }

        let mut decoder = FrameDecoder::new();
        let mut observed = Vec::new();
        for byte in &wire {
            decoder.feed(std::slice::from_ref(byte));
            while let Some(frame) = decoder.next_frame().expect("valid frame") {
                observed.push(frame);
            }
        }

        assert_eq!(observed, frames);
        assert!(!decoder.has_leftover_data());
    }

    #[test]
    fn rejects_bad_magic_in_streaming_mode() {
        let mut decoder = FrameDecoder::new();
        let mut bad = vec![0u8; FrameHeader::SIZE];
        bad[0] = 0x00;
        decoder.feed(&bad);
        assert!(matches!(decoder.next_frame(), Err(ProtocolError::BadMagic { .. })));
    }

    proptest! {
        #[test]
        fn frame_round_trip(
            session_id in any::<u32>(),
            sequence in any::<u32>(),
            msg_type in any::<u16>(),
            payload in prop::collection::vec(any::<u8>(), 0..4096),
        ) {
            let frame = Frame::new(session_id, sequence, msg_type, payload.clone());
            let mut wire = Vec::new();
            frame.encode(&mut wire);
            let decoded = Frame::decode(&wire).expect("decode");
            prop_assert_eq!(decoded.payload, Bytes::from(payload));
            prop_assert_eq!(decoded.header.session_id(), session_id);
            prop_assert_eq!(decoded.header.sequence(), sequence);
            prop_assert_eq!(decoded.header.msg_type(), msg_type);
        }

        #[test]
        fn split_decoder_matches_whole_buffer(
            frames in prop::collection::vec(
                (any::<u32>(), any::<u16>(), prop::collection::vec(any::<u8>(), 0..256)),
                1..8,
            ),
            split_at in 0usize..4096,
        ) {
            let mut wire = Vec::new();
            let mut built = Vec::new();
            for (idx, (session_id, msg_type, payload)) in frames.into_iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let sequence = idx as u32;
                let frame = Frame::new(session_id, sequence, msg_type, payload);
                frame.encode(&mut wire);
                built.push(frame);
            }

            let split = split_at.min(wire.len());
            let (first, second) = wire.split_at(split);

            let mut decoder = FrameDecoder::new();
            let mut observed = Vec::new();
            decoder.feed(first);
            while let Some(frame) = decoder.next_frame().expect("valid frame") {
                observed.push(frame);
            }
            decoder.feed(second);
            while let Some(frame) = decoder.next_frame().expect("valid frame") {
                observed.push(frame);
            }

            prop_assert_eq!(observed, built);
        }
    }
}
