//! Error taxonomy for the session layer.
//!
//! Each variant documents its propagation policy: what it's fatal to, and
//! who gets notified.

use std::io;

use thiserror::Error;

use crate::session::SessionState;

/// Errors produced by [`crate::session::Session`] and propagated to waiters,
/// subscriptions, or the caller that attempted an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// DNS, TCP connect, read, or write failure. Fatal to the session:
    /// completes every pending waiter and subscription with this cause.
    #[error("transport error: {0}")]
    Transport(String),

    /// Header magic/version mismatch, payload-length mismatch, truncated
    /// JSON, or a missing required field. Fatal to the session.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Device replied with `Ret != 100`. Completes only the owning request;
    /// the session stays `Ready`.
    #[error("remote error: Ret={code}")]
    Remote {
        /// The device's `Ret` code.
        code: i64,
    },

    /// A one-shot request's deadline expired before a reply arrived.
    #[error("request timed out")]
    Timeout,

    /// The user closed the subscription or session before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// A duplicate one-shot request was registered for a reply type that
    /// already has a waiter. Immediate caller-side failure; does not affect
    /// the session or the original request.
    #[error("conflicting request already pending for this reply type")]
    Conflict,

    /// Attempted an operation invalid for the session's current state.
    #[error("invalid operation for session state {state:?}: {operation}")]
    InvalidState {
        /// Current session state.
        state: SessionState,
        /// Operation that was attempted.
        operation: &'static str,
    },
}

impl SessionError {
    /// `true` if this error is fatal to the whole session (transport or
    /// protocol failure), as opposed to scoped to a single request.
    #[must_use]
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }
}

impl From<sofia_proto::ProtocolError> for SessionError {
    fn from(err: sofia_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
