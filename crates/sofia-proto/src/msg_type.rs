//! Catalogue of device message types used by the core.
//!
//! Each request type has exactly one corresponding response type; devices
//! never reply on a different type than the ones listed here. The set is
//! treated as closed: unrecognized codes are passed through as raw `u16`
//! rather than rejected, since new device firmware can add message types this
//! client doesn't need to understand.

/// A known request/response message type pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MsgType(pub u16);

impl MsgType {
    /// `LOGIN_REQ`: client -> device login attempt.
    pub const LOGIN_REQ: Self = Self(1000);
    /// `LOGIN_RSP`: device -> client login result.
    pub const LOGIN_RSP: Self = Self(1001);

    /// `KEEPALIVE_REQ`: client -> device keep-alive ping.
    pub const KEEPALIVE_REQ: Self = Self(1006);
    /// `KEEPALIVE_RSP`: device -> client keep-alive ack.
    pub const KEEPALIVE_RSP: Self = Self(1007);

    /// `SYSINFO_REQ`: client -> device system info query.
    pub const SYSINFO_REQ: Self = Self(1020);
    /// `SYSINFO_RSP`: device -> client system info reply.
    pub const SYSINFO_RSP: Self = Self(1021);

    /// `CONFIG_REQ`: client -> device config read/write.
    pub const CONFIG_REQ: Self = Self(1042);
    /// `CONFIG_RSP`: device -> client config reply.
    pub const CONFIG_RSP: Self = Self(1043);

    /// `SNAP_REQ`: client -> device still-picture capture.
    pub const SNAP_REQ: Self = Self(1280);
    /// `SNAP_RSP`: device -> client still-picture reply (binary payload).
    pub const SNAP_RSP: Self = Self(1281);

    /// `MONITOR_REQ`: client -> device live-video claim.
    pub const MONITOR_REQ: Self = Self(1410);
    /// `MONITOR_RSP`: device -> client live-video data pushes.
    pub const MONITOR_RSP: Self = Self(1411);

    /// `PLAYBACK_REQ`: client -> device remote-playback claim.
    pub const PLAYBACK_REQ: Self = Self(1420);
    /// `PLAYBACK_RSP`: device -> client remote-playback data pushes.
    pub const PLAYBACK_RSP: Self = Self(1421);

    /// `GUARD_REQ`: client -> device alarm subscription.
    pub const GUARD_REQ: Self = Self(1500);
    /// `GUARD_RSP`: device -> client alarm event pushes.
    pub const GUARD_RSP: Self = Self(1501);

    /// Raw numeric code as sent on the wire.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }
}

impl From<u16> for MsgType {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<MsgType> for u16 {
    fn from(msg_type: MsgType) -> Self {
        msg_type.0
    }
}
