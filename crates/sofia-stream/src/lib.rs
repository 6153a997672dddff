//! Incremental demultiplexer for the binary Captured Stream container used
//! by live video and remote playback data pushes.
//!
//! The container is a flat sequence of chunks, each introduced by a 4-byte
//! magic identifying its kind (video I-frame, video P-frame, audio,
//! metadata), followed by a kind-specific fixed header, a 4-byte length, and
//! that many bytes of payload. [`CapturedStreamParser`] strips the container
//! framing and delivers raw payload bytes to a [`ChunkSink`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod chunk;
pub mod errors;
pub mod parser;

pub use chunk::ChunkKind;
pub use errors::StreamError;
pub use parser::{CapturedStreamParser, ChunkSink, MAX_CHUNK_PAYLOAD_LEN};
