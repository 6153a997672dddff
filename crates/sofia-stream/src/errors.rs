//! Errors produced while demultiplexing a Captured Stream.

use thiserror::Error;

/// Errors produced by [`crate::parser::CapturedStreamParser`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The 4-byte little-endian magic at a chunk boundary did not match any
    /// known chunk kind.
    #[error("unknown chunk magic: {magic:#010x}")]
    UnknownChunk {
        /// The unrecognized magic value.
        magic: u32,
    },

    /// A chunk header declared a payload length larger than
    /// [`crate::parser::MAX_CHUNK_PAYLOAD_LEN`].
    #[error("chunk declared an impossible payload length: {declared}")]
    BadLength {
        /// The declared length.
        declared: u32,
    },

    /// The parser encountered a malformed chunk and cannot continue until
    /// [`crate::parser::CapturedStreamParser::reset`] is called.
    #[error("parser is poisoned by a previous error")]
    Poisoned,
}
