//! Incremental Captured Stream demultiplexer.

use bytes::BytesMut;

use crate::{chunk::ChunkKind, errors::StreamError};

/// Upper bound on a single chunk's declared payload length. Guards against a
/// corrupt or adversarial length field causing unbounded buffering.
pub const MAX_CHUNK_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Receives demultiplexed chunk payloads as the parser delivers them.
///
/// Payload bytes are handed over stripped of every container header; a
/// single chunk's payload may be split across multiple calls to the same
/// method when it arrives across more than one [`CapturedStreamParser::feed`]
/// call.
pub trait ChunkSink {
    /// Deliver (a slice of) a video key frame's payload.
    fn on_i_frame(&mut self, bytes: &[u8]);
    /// Deliver (a slice of) a video delta frame's payload.
    fn on_p_frame(&mut self, bytes: &[u8]);
    /// Deliver (a slice of) an audio payload.
    fn on_audio(&mut self, bytes: &[u8]);
    /// Deliver (a slice of) a metadata payload.
    fn on_metadata(&mut self, bytes: &[u8]);

    /// Route to the kind-specific callback.
    fn deliver(&mut self, kind: ChunkKind, bytes: &[u8]) {
        match kind {
            ChunkKind::IFrame => self.on_i_frame(bytes),
            ChunkKind::PFrame => self.on_p_frame(bytes),
            ChunkKind::Audio => self.on_audio(bytes),
            ChunkKind::Metadata => self.on_metadata(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitMagic,
    AwaitHeader { kind: ChunkKind },
    AwaitPayload { kind: ChunkKind, remaining: usize },
    Poisoned,
}

/// Stateful parser for the binary Captured Stream container.
///
/// Feed it bytes as they arrive via [`CapturedStreamParser::feed`]; it
/// delivers complete or partial chunk payloads to a [`ChunkSink`] as soon as
/// they're available, never buffering more than one chunk header's worth of
/// bytes internally.
#[derive(Debug)]
pub struct CapturedStreamParser {
    state: State,
    buffer: BytesMut,
}

impl Default for CapturedStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CapturedStreamParser {
    /// Create a parser ready to read a chunk boundary.
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::AwaitMagic, buffer: BytesMut::new() }
    }

    /// `true` if bytes are buffered but no complete chunk payload has been
    /// delivered for them yet. At end-of-stream this must be `false` for a
    /// clean shutdown; `true` means the device closed mid-chunk.
    #[must_use]
    pub fn has_leftover_data(&self) -> bool {
        !matches!(self.state, State::AwaitMagic) || !self.buffer.is_empty()
    }

    /// Clear a [`StreamError::Poisoned`] parser and resume at a chunk
    /// boundary. Any bytes buffered for the chunk that caused the failure
    /// are discarded.
    pub fn reset(&mut self) {
        self.state = State::AwaitMagic;
        self.buffer.clear();
    }

    /// Feed newly-arrived bytes, delivering chunk payloads to `sink` as soon
    /// as enough bytes are available.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnknownChunk`] or [`StreamError::BadLength`] on
    /// a malformed chunk header, after which the parser is [`State::Poisoned`]
    /// and every subsequent call returns [`StreamError::Poisoned`] until
    /// [`CapturedStreamParser::reset`] is called. Returns
    /// [`StreamError::Poisoned`] immediately if already poisoned.
    pub fn feed(&mut self, mut data: &[u8], sink: &mut dyn ChunkSink) -> Result<(), StreamError> {
        if self.state == State::Poisoned {
            return Err(StreamError::Poisoned);
        }

        while !data.is_empty() {
            match self.state {
                State::Poisoned => return Err(StreamError::Poisoned),

                State::AwaitMagic => {
                    let need = 4 - self.buffer.len();
                    let take = need.min(data.len());
                    self.buffer.extend_from_slice(&data[..take]);
                    data = &data[take..];

                    if self.buffer.len() < 4 {
                        break;
                    }

                    let mut magic_bytes = [0u8; 4];
                    magic_bytes.copy_from_slice(&self.buffer[..4]);
                    let magic = u32::from_le_bytes(magic_bytes);
                    self.buffer.clear();

                    match ChunkKind::from_magic(magic) {
                        Some(kind) => self.state = State::AwaitHeader { kind },
                        None => {
                            self.state = State::Poisoned;
                            return Err(StreamError::UnknownChunk { magic });
                        },
                    }
                },

                State::AwaitHeader { kind } => {
                    let header_len = kind.header_len();
                    let need = header_len - self.buffer.len();
                    let take = need.min(data.len());
                    self.buffer.extend_from_slice(&data[..take]);
                    data = &data[take..];

                    if self.buffer.len() < header_len {
                        break;
                    }

                    let length = match kind.parse_length(&self.buffer) {
                        Ok(length) => length,
                        Err(err) => {
                            self.state = State::Poisoned;
                            return Err(err);
                        },
                    };
                    self.buffer.clear();
                    self.state = if length == 0 {
                        State::AwaitMagic
                    } else {
                        State::AwaitPayload { kind, remaining: length }
                    };
                },

                State::AwaitPayload { kind, remaining } => {
                    let take = remaining.min(data.len());
                    sink.deliver(kind, &data[..take]);
                    data = &data[take..];
                    let remaining = remaining - take;

                    self.state = if remaining == 0 {
                        State::AwaitMagic
                    } else {
                        State::AwaitPayload { kind, remaining }
                    };
                },
            }
        }

        Ok(())
    }
}
