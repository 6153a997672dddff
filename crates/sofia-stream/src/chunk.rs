//! Chunk kinds and their fixed-layout headers.
//!
//! Every chunk in a Captured Stream container opens with a 4-byte
//! little-endian magic identifying its kind, followed by a kind-specific
//! fixed-size header, followed by a 4-byte little-endian payload length,
//! followed by that many bytes of payload.

use crate::errors::StreamError;

/// The four payload kinds a Captured Stream container carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Video key frame (full picture, decodable on its own).
    IFrame,
    /// Video delta frame (decodable only relative to a preceding I-frame).
    PFrame,
    /// Compressed audio payload.
    Audio,
    /// Side-channel metadata (OSD text, PTZ status, and similar).
    Metadata,
}

impl ChunkKind {
    /// Magic for [`ChunkKind::IFrame`].
    pub const I_FRAME_MAGIC: u32 = 0x0000_01FC;
    /// Magic for [`ChunkKind::PFrame`].
    pub const P_FRAME_MAGIC: u32 = 0x0000_01FD;
    /// Magic for [`ChunkKind::Audio`].
    pub const AUDIO_MAGIC: u32 = 0x0000_01FE;
    /// Magic for [`ChunkKind::Metadata`].
    pub const METADATA_MAGIC: u32 = 0x0000_01FF;

    /// Resolve a 4-byte little-endian magic to its chunk kind, if known.
    #[must_use]
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            Self::I_FRAME_MAGIC => Some(Self::IFrame),
            Self::P_FRAME_MAGIC => Some(Self::PFrame),
            Self::AUDIO_MAGIC => Some(Self::Audio),
            Self::METADATA_MAGIC => Some(Self::Metadata),
            _ => None,
        }
    }

    /// Number of header bytes following the magic, not counting the trailing
    /// 4-byte length field itself (which is included in this count).
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            // frame-type, frame-rate, width-factor, height-factor, then length(4)
            Self::IFrame => 8,
            // no descriptive bytes, just length(4)
            Self::PFrame => 4,
            // codec id, sample-rate index, reserved(2), then length(4)
            Self::Audio => 8,
            // length(4) only
            Self::Metadata => 4,
        }
    }

    /// Parse the trailing 4-byte little-endian length out of a fully
    /// buffered header (`header.len() == self.header_len()`).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::BadLength`] if the declared length exceeds
    /// [`crate::parser::MAX_CHUNK_PAYLOAD_LEN`].
    pub fn parse_length(self, header: &[u8]) -> Result<usize, StreamError> {
        debug_assert_eq!(header.len(), self.header_len());
        let len_offset = self.header_len() - 4;
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&header[len_offset..len_offset + 4]);
        let declared = u32::from_le_bytes(len_bytes);

        if declared as usize > crate::parser::MAX_CHUNK_PAYLOAD_LEN {
            return Err(StreamError::BadLength { declared });
        }

        Ok(declared as usize)
    }
}
