//! Request/reply correlation and subscription bookkeeping.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;

/// Identifies which inbound frame a pending one-shot request is waiting for.
///
/// Most requests key on `msgType` alone since each request type has exactly
/// one reply type. `ByTypeAndSequence` exists for reply types shared by more
/// than one logical request (config read vs. write both reply on
/// `CONFIG_RSP`); the echoed `sequence` disambiguates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorrelationKey {
    /// Matches any inbound frame with this `msgType`.
    ByType(u16),
    /// Matches an inbound frame with this `msgType` whose payload echoes this
    /// outbound `sequence`.
    ByTypeAndSequence(u16, u32),
}

/// Outcome delivered to a one-shot request's waiter.
#[derive(Debug, Clone)]
pub enum WaiterOutcome {
    /// The device replied with `Ret=100`; carries the raw response payload.
    Success(Bytes),
    /// The device replied with `Ret != 100`.
    Remote {
        /// The device's `Ret` code.
        code: i64,
    },
    /// The request's deadline expired before a reply arrived.
    Timeout,
    /// The session closed before a reply arrived.
    SessionClosed(SessionError),
}

/// A registered one-shot request awaiting its reply.
#[derive(Debug)]
pub(crate) struct Waiter<I> {
    pub(crate) sender: oneshot::Sender<WaiterOutcome>,
    pub(crate) deadline: Option<I>,
}

/// A long-lived receiver of pushed frames for one `msgType` (alarm events,
/// live video, remote playback).
#[derive(Debug)]
pub(crate) struct Subscription {
    pub(crate) sender: mpsc::UnboundedSender<Bytes>,
}

/// Handle to an active subscription returned to the caller.
///
/// Closing is idempotent: a second `close()` is a no-op.
#[derive(Debug)]
pub struct SubscriptionHandle {
    msg_type: u16,
    closed: std::sync::atomic::AtomicBool,
}

impl SubscriptionHandle {
    pub(crate) fn new(msg_type: u16) -> Self {
        Self { msg_type, closed: std::sync::atomic::AtomicBool::new(false) }
    }

    /// The `msgType` this subscription is registered for.
    #[must_use]
    pub fn msg_type(&self) -> u16 {
        self.msg_type
    }

    /// `true` once [`SubscriptionHandle::mark_closed`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Mark the handle closed. Idempotent.
    pub fn mark_closed(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
    }
}
