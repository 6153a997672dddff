//! Client-facing error type.

use sofia_core::SessionError;
use thiserror::Error;

/// Errors surfaced by [`crate::Recorder`] and the connection it drives.
#[derive(Error, Debug)]
pub enum ClientError {
    /// TCP connect, read, or write failure observed directly by the caller
    /// (e.g. the initial `connect()` before a [`sofia_core::Session`] exists).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session rejected the operation, timed out, reported a remote
    /// error, or closed while the operation was pending.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The device replied to a request with `Ret != 100`.
    #[error("device rejected request: Ret={code}")]
    Remote {
        /// The device's `Ret` code.
        code: i64,
    },

    /// A reply payload didn't contain the fields this operation expects.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// The I/O task that owns the socket has already shut down.
    #[error("connection closed")]
    ConnectionClosed,

    /// A reply frame's JSON payload failed to decode.
    #[error(transparent)]
    Protocol(#[from] sofia_proto::ProtocolError),
}

/// Resolve a completed waiter into the reply payload or a [`ClientError`].
pub(crate) fn resolve_outcome(
    outcome: sofia_core::WaiterOutcome,
) -> Result<bytes::Bytes, ClientError> {
    match outcome {
        sofia_core::WaiterOutcome::Success(payload) => Ok(payload),
        sofia_core::WaiterOutcome::Remote { code } => Err(ClientError::Remote { code }),
        sofia_core::WaiterOutcome::Timeout => Err(ClientError::Session(SessionError::Timeout)),
        sofia_core::WaiterOutcome::SessionClosed(err) => Err(ClientError::Session(err)),
    }
}
