//! Frame header implementation with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 20-byte structure serialized as raw binary
//! (Little Endian, per the device's wire format). Storing it as raw byte
//! arrays rather than native integers avoids alignment requirements and lets
//! it be cast directly from a socket read buffer.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::ProtocolError;

/// Fixed 20-byte frame header (Little Endian wire order).
///
/// Layout, byte-for-byte:
///
/// | offset | size | field        |
/// |-------:|-----:|--------------|
/// |      0 |    1 | head (0xFF)  |
/// |      1 |    1 | version      |
/// |      2 |    2 | reserved     |
/// |      4 |    4 | session_id   |
/// |      8 |    4 | sequence     |
/// |     12 |    1 | channel      |
/// |     13 |    1 | end_flag     |
/// |     14 |    2 | msg_type     |
/// |     16 |    4 | payload_len  |
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    head: u8,
    version: u8,
    reserved: [u8; 2],
    session_id: [u8; 4],
    sequence: [u8; 4],
    channel: u8,
    end_flag: u8,
    msg_type: [u8; 2],
    payload_len: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 20;

    /// Fixed magic value of the `head` byte.
    pub const HEAD: u8 = 0xFF;

    /// Current (and only) protocol version.
    pub const VERSION: u8 = 0x01;

    /// Build a header for an outbound control frame.
    ///
    /// `channel` and `end_flag` are left at zero, matching every control
    /// message this library sends; video/playback data pushes arrive with
    /// device-assigned values and are preserved by [`FrameHeader::from_bytes`].
    #[must_use]
    pub fn new(session_id: u32, sequence: u32, msg_type: u16, payload_len: u32) -> Self {
        Self {
            head: Self::HEAD,
            version: Self::VERSION,
            reserved: [0, 0],
            session_id: session_id.to_le_bytes(),
            sequence: sequence.to_le_bytes(),
            channel: 0,
            end_flag: 0,
            msg_type: msg_type.to_le_bytes(),
            payload_len: payload_len.to_le_bytes(),
        }
    }

    /// Parse a header from the first [`FrameHeader::SIZE`] bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::HeaderTooShort`] if fewer than 20 bytes are supplied.
    /// - [`ProtocolError::BadMagic`] if `head` is not `0xFF`.
    /// - [`ProtocolError::BadVersion`] if `version` is not `0x01`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (header, _) = Self::ref_from_prefix(bytes).map_err(|_| ProtocolError::HeaderTooShort {
            expected: Self::SIZE,
            actual: bytes.len(),
        })?;

        if header.head != Self::HEAD {
            return Err(ProtocolError::BadMagic { expected: Self::HEAD, actual: header.head });
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::BadVersion(header.version));
        }

        Ok(*header)
    }

    /// Serialize the header to its 20-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Session id assigned by the device at login (`0` before login).
    #[must_use]
    pub fn session_id(&self) -> u32 {
        u32::from_le_bytes(self.session_id)
    }

    /// Client-monotonic sequence number.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        u32::from_le_bytes(self.sequence)
    }

    /// Channel index; zero for all control traffic.
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// End-of-stream flag; zero for all control traffic.
    #[must_use]
    pub fn end_flag(&self) -> u8 {
        self.end_flag
    }

    /// Inbound/outbound message type code.
    #[must_use]
    pub fn msg_type(&self) -> u16 {
        u16::from_le_bytes(self.msg_type)
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub fn payload_len(&self) -> u32 {
        u32::from_le_bytes(self.payload_len)
    }
}

// Manual Debug/PartialEq: `#[repr(packed)]` fields can't be referenced
// directly without triggering unaligned-reference lints.
impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("head", &format!("{:#04x}", self.head))
            .field("version", &self.version)
            .field("session_id", &format!("{:#010x}", self.session_id()))
            .field("sequence", &self.sequence())
            .field("channel", &self.channel)
            .field("end_flag", &self.end_flag)
            .field("msg_type", &self.msg_type())
            .field("payload_len", &self.payload_len())
            .finish()
    }
}

impl PartialEq for FrameHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for FrameHeader {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn header_size_is_twenty_bytes() {
        assert_eq!(std::mem::size_of::<FrameHeader>(), FrameHeader::SIZE);
        assert_eq!(FrameHeader::SIZE, 20);
    }

    #[test]
    fn reject_short_buffer() {
        let short = [0u8; 10];
        assert_eq!(
            FrameHeader::from_bytes(&short),
            Err(ProtocolError::HeaderTooShort { expected: 20, actual: 10 })
        );
    }

    #[test]
    fn reject_bad_magic() {
        let mut buf = [0u8; 20];
        buf[0] = 0x00;
        buf[1] = FrameHeader::VERSION;
        assert_eq!(
            FrameHeader::from_bytes(&buf),
            Err(ProtocolError::BadMagic { expected: 0xFF, actual: 0x00 })
        );
    }

    #[test]
    fn reject_bad_version() {
        let mut buf = [0u8; 20];
        buf[0] = FrameHeader::HEAD;
        buf[1] = 0x02;
        assert_eq!(FrameHeader::from_bytes(&buf), Err(ProtocolError::BadVersion(0x02)));
    }

    proptest! {
        #[test]
        fn header_round_trip(
            session_id in any::<u32>(),
            sequence in any::<u32>(),
            msg_type in any::<u16>(),
            payload_len in any::<u32>(),
        ) {
            let header = FrameHeader::new(session_id, sequence, msg_type, payload_len);
            let bytes = header.to_bytes();
            let parsed = FrameHeader::from_bytes(&bytes).expect("should parse");

            prop_assert_eq!(parsed.session_id(), session_id);
            prop_assert_eq!(parsed.sequence(), sequence);
            prop_assert_eq!(parsed.msg_type(), msg_type);
            prop_assert_eq!(parsed.payload_len(), payload_len);
        }
    }
}
