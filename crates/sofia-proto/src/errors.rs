//! Error types for frame and payload encoding/decoding.

use thiserror::Error;

/// Errors produced while framing or parsing the wire protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Header `head` byte was not `0xFF`.
    #[error("bad magic: expected {expected:#04x}, got {actual:#04x}")]
    BadMagic {
        /// Expected magic byte.
        expected: u8,
        /// Byte actually observed.
        actual: u8,
    },

    /// Header `version` byte was not `0x01`.
    #[error("unsupported protocol version: {0:#04x}")]
    BadVersion(u8),

    /// Fewer bytes were supplied than the fixed header size.
    #[error("frame header too short: expected {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Bytes required.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// `payloadLen` in the header did not match the bytes actually supplied.
    #[error("payload length mismatch: header declared {declared}, buffer has {actual}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: u32,
        /// Length actually available.
        actual: usize,
    },

    /// JSON payload failed to parse.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
}
