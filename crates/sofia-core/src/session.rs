//! Session state machine: the single TCP connection, its login handshake,
//! keep-alive timer, and inbound frame routing.
//!
//! Uses the action pattern: methods take time as input and return actions
//! for the driver (the I/O task in `sofia-client`) to execute. Waiter
//! completion and subscription delivery happen synchronously inside these
//! methods via channels supplied by the caller, since Sofia's request/reply
//! model needs to hand a typed result back to exactly one `.await`er per
//! one-shot operation — the design notes call this out explicitly as an
//! acceptable substitute for completion callbacks.
//!
//! ```text
//! Disconnected ──connect()──> Connecting ──send_login_request()──> LoggingIn
//!                                                                       │
//!                                                     LOGIN_RSP Ret=100 │
//!                                                                       ▼
//!                                                                    Ready
//!                                                                       │
//!                                                    close() / fatal error
//!                                                                       ▼
//!                                                  Closing ──────────> Closed
//! ```

use std::{collections::HashMap, ops::Sub, time::Duration};

use bytes::Bytes;
use serde::Serialize;
use sofia_proto::{decode_json_payload, encode_json_payload, Frame, MsgType};
use tokio::sync::{mpsc, oneshot};

use crate::{
    correlation::{CorrelationKey, Subscription, SubscriptionHandle, Waiter, WaiterOutcome},
    error::SessionError,
};

/// Default deadline for a one-shot request when the caller doesn't supply one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No TCP connection attempted yet.
    Disconnected,
    /// TCP connect in progress.
    Connecting,
    /// TCP connected; `LOGIN_REQ` sent, awaiting `LOGIN_RSP`.
    LoggingIn,
    /// Logged in; requests and subscriptions may be issued.
    Ready,
    /// Tearing down: no new requests accepted, pending work being drained.
    Closing,
    /// Fully torn down.
    Closed,
}

/// Either form a reply type can be correlated by, chosen by the caller based
/// on whether its reply type is exclusive to this request.
#[derive(Debug, Clone, Copy)]
pub enum CorrelationKeySpec {
    /// This reply `msgType` is used by exactly one kind of request.
    ByType(u16),
    /// This reply `msgType` is shared by multiple requests; disambiguate by
    /// the echoed outbound `sequence`.
    ByTypeAndSequence(u16),
}

/// An action the driver must execute: write a frame, or tear the connection
/// down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write this frame to the transport.
    SendFrame(Frame),
    /// Close the transport with this reason.
    Close {
        /// Human-readable reason, propagated into logs.
        reason: String,
    },
}

/// Message types the device may push unsolicited (e.g. alarms nobody
/// subscribed to this run); dropped silently rather than logged as
/// unexpected.
fn is_known_async_event(msg_type: u16) -> bool {
    matches!(
        msg_type,
        v if v == MsgType::GUARD_RSP.code()
            || v == MsgType::MONITOR_RSP.code()
            || v == MsgType::PLAYBACK_RSP.code()
    )
}

fn extract_ret(payload: &[u8]) -> Option<i64> {
    let value: serde_json::Value = decode_json_payload(payload).ok()?;
    value.get("Ret").and_then(serde_json::Value::as_i64)
}

fn parse_session_id_hex(raw: &str) -> Result<u32, SessionError> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
    u32::from_str_radix(digits, 16)
        .map_err(|_| SessionError::Protocol(format!("malformed SessionID: {raw:?}")))
}

fn session_id_to_hex(session_id: u32) -> String {
    format!("0x{session_id:x}")
}

/// Single TCP connection's session state: login handshake, keep-alive timer,
/// outbound sequencing, and inbound routing to waiters/subscriptions.
///
/// Pure state machine plus channel endpoints — no socket I/O. The I/O task in
/// `sofia-client` owns the socket, feeds decoded frames to
/// [`Session::handle_inbound`], and executes the [`SessionAction`]s returned
/// by every mutating method.
///
/// Generic over the instant type so tests can drive `tick()` with synthetic
/// time instead of sleeping in real time.
#[derive(Debug)]
pub struct Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: SessionState,
    session_id: u32,
    next_sequence: u32,
    keep_alive_interval: Option<Duration>,
    last_send: Option<I>,
    pending_keepalive_sent: Option<I>,
    keepalive_misses: u8,
    waiters: HashMap<CorrelationKey, Waiter<I>>,
    subscriptions: HashMap<u16, Subscription>,
}

impl<I> Default for Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new session in [`SessionState::Disconnected`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            session_id: 0,
            next_sequence: 0,
            keep_alive_interval: None,
            last_send: None,
            pending_keepalive_sent: None,
            keepalive_misses: 0,
            waiters: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session id assigned by the device at login (`0` before login).
    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Keep-alive interval reported by the device at login.
    #[must_use]
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        self.keep_alive_interval
    }

    /// Mark the TCP connection as in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] if not [`SessionState::Disconnected`].
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Disconnected {
            return Err(SessionError::InvalidState { state: self.state, operation: "connect" });
        }
        self.state = SessionState::Connecting;
        Ok(())
    }

    fn assign_sequence(&mut self) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }

    fn register_waiter(
        &mut self,
        key: CorrelationKey,
        deadline: Option<I>,
        reply: oneshot::Sender<WaiterOutcome>,
    ) -> Result<(), SessionError> {
        if self.waiters.contains_key(&key) {
            return Err(SessionError::Conflict);
        }
        self.waiters.insert(key, Waiter { sender: reply, deadline });
        Ok(())
    }

    /// Send `LOGIN_REQ` and register a waiter for `LOGIN_RSP`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not [`SessionState::Connecting`].
    /// - [`SessionError::Conflict`] if a login is already pending.
    pub fn send_login_request(
        &mut self,
        username: &str,
        password: &str,
        now: I,
        deadline: Option<I>,
        reply: oneshot::Sender<WaiterOutcome>,
    ) -> Result<SessionAction, SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "send_login_request",
            });
        }

        let key = CorrelationKey::ByType(MsgType::LOGIN_RSP.code());
        self.register_waiter(key, deadline, reply)?;

        let hashed = sofia_crypto::hash_password(password);
        let body = serde_json::json!({
            "EncryptType": "MD5",
            "LoginType": "DVR-Recorder",
            "PassWord": hashed,
            "UserName": username,
        });
        let payload = encode_json_payload(&body)?;

        let sequence = self.assign_sequence();
        self.last_send = Some(now);
        self.state = SessionState::LoggingIn;

        Ok(SessionAction::SendFrame(Frame::new(
            self.session_id,
            sequence,
            MsgType::LOGIN_REQ.code(),
            payload,
        )))
    }

    /// Send a one-shot JSON request and register a waiter for its reply.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not [`SessionState::Ready`].
    /// - [`SessionError::Conflict`] if a waiter is already registered for the
    ///   resolved correlation key.
    pub fn send_request(
        &mut self,
        key_spec: CorrelationKeySpec,
        msg_type: u16,
        body: &impl Serialize,
        now: I,
        deadline: Option<I>,
        reply: oneshot::Sender<WaiterOutcome>,
    ) -> Result<SessionAction, SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::InvalidState { state: self.state, operation: "send_request" });
        }

        let sequence = self.assign_sequence();
        let key = match key_spec {
            CorrelationKeySpec::ByType(t) => CorrelationKey::ByType(t),
            CorrelationKeySpec::ByTypeAndSequence(t) => CorrelationKey::ByTypeAndSequence(t, sequence),
        };
        self.register_waiter(key, deadline, reply)?;

        let payload = encode_json_payload(body)?;
        self.last_send = Some(now);

        Ok(SessionAction::SendFrame(Frame::new(self.session_id, sequence, msg_type, payload)))
    }

    /// Create a subscription for `msg_type` and send its claim frame in one
    /// step (live video, remote playback, and alarm monitoring all claim a
    /// push channel rather than waiting on a single reply).
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidState`] if not [`SessionState::Ready`].
    /// - [`SessionError::Conflict`] if already subscribed to `msg_type`.
    pub fn subscribe_and_send(
        &mut self,
        msg_type: u16,
        claim_msg_type: u16,
        body: &impl Serialize,
        now: I,
        sender: mpsc::UnboundedSender<Bytes>,
    ) -> Result<(SubscriptionHandle, SessionAction), SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "subscribe_and_send",
            });
        }
        if self.subscriptions.contains_key(&msg_type) {
            return Err(SessionError::Conflict);
        }

        self.subscriptions.insert(msg_type, Subscription { sender });

        let payload = encode_json_payload(body)?;
        let sequence = self.assign_sequence();
        self.last_send = Some(now);

        let action =
            SessionAction::SendFrame(Frame::new(self.session_id, sequence, claim_msg_type, payload));
        Ok((SubscriptionHandle::new(msg_type), action))
    }

    /// Remove a subscription. Idempotent.
    pub fn unsubscribe(&mut self, handle: &SubscriptionHandle) {
        if handle.is_closed() {
            return;
        }
        handle.mark_closed();
        self.subscriptions.remove(&handle.msg_type());
    }

    /// Route a decoded inbound frame to its subscription, waiter, or the
    /// drop path, per the fixed priority order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Protocol`] if a `LOGIN_RSP` payload is
    /// malformed (missing `SessionID`, unparsable hex).
    pub fn handle_inbound(&mut self, frame: Frame, _now: I) -> Result<Vec<SessionAction>, SessionError> {
        let msg_type = frame.header.msg_type();
        let sequence = frame.header.sequence();
        let payload = frame.payload;

        if self.state == SessionState::LoggingIn && msg_type == MsgType::LOGIN_RSP.code() {
            return self.handle_login_reply(payload);
        }

        if msg_type == MsgType::KEEPALIVE_RSP.code() {
            self.pending_keepalive_sent = None;
            self.keepalive_misses = 0;
            return Ok(vec![]);
        }

        if let Some(subscription) = self.subscriptions.get(&msg_type) {
            // A closed receiver just means the user dropped the handle
            // without calling unsubscribe(); next tick cleans it up.
            let _ = subscription.sender.send(payload);
            return Ok(vec![]);
        }

        let specific = CorrelationKey::ByTypeAndSequence(msg_type, sequence);
        let general = CorrelationKey::ByType(msg_type);
        let waiter = self.waiters.remove(&specific).or_else(|| self.waiters.remove(&general));

        if let Some(waiter) = waiter {
            let outcome = match extract_ret(&payload) {
                Some(100) | None => WaiterOutcome::Success(payload),
                Some(code) => WaiterOutcome::Remote { code },
            };
            let _ = waiter.sender.send(outcome);
            return Ok(vec![]);
        }

        if is_known_async_event(msg_type) {
            return Ok(vec![]);
        }

        tracing::debug!(msg_type, sequence, "UnexpectedMessageType: dropping unrouted frame");
        Ok(vec![])
    }

    fn handle_login_reply(&mut self, payload: Bytes) -> Result<Vec<SessionAction>, SessionError> {
        let key = CorrelationKey::ByType(MsgType::LOGIN_RSP.code());
        let waiter = self.waiters.remove(&key);

        let value: serde_json::Value = decode_json_payload(&payload)?;
        let ret = value.get("Ret").and_then(serde_json::Value::as_i64).unwrap_or(0);

        if ret != 100 {
            self.state = SessionState::Closing;
            if let Some(waiter) = waiter {
                let _ = waiter.sender.send(WaiterOutcome::Remote { code: ret });
            }
            return Ok(vec![SessionAction::Close { reason: format!("login failed: Ret={ret}") }]);
        }

        let session_id_hex = value
            .get("SessionID")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SessionError::Protocol("login reply missing SessionID".to_owned()))?;
        self.session_id = parse_session_id_hex(session_id_hex)?;

        let alive_interval = value.get("AliveInterval").and_then(serde_json::Value::as_u64).unwrap_or(0);
        self.keep_alive_interval = Some(Duration::from_secs(alive_interval));
        self.state = SessionState::Ready;

        if let Some(waiter) = waiter {
            let _ = waiter.sender.send(WaiterOutcome::Success(payload));
        }

        Ok(vec![])
    }

    /// Periodic maintenance: send a keep-alive if due, and force `Closing`
    /// after two consecutive missed replies.
    ///
    /// Call this regularly (e.g. every second) from the I/O task's timer.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        if self.state != SessionState::Ready {
            return Vec::new();
        }
        let Some(interval) = self.keep_alive_interval else {
            return Vec::new();
        };

        let due = match self.last_send {
            None => true,
            Some(last) => now - last >= interval,
        };
        if !due {
            return Vec::new();
        }

        if self.pending_keepalive_sent.is_some() {
            self.keepalive_misses += 1;
            if self.keepalive_misses >= 2 {
                self.state = SessionState::Closing;
                return vec![SessionAction::Close {
                    reason: "missed two consecutive keep-alive replies".to_owned(),
                }];
            }
        }

        let body = serde_json::json!({ "Name": "KeepAlive", "SessionID": session_id_to_hex(self.session_id) });
        let Ok(payload) = encode_json_payload(&body) else {
            return Vec::new();
        };

        let sequence = self.assign_sequence();
        self.last_send = Some(now);
        self.pending_keepalive_sent = Some(now);

        vec![SessionAction::SendFrame(Frame::new(
            self.session_id,
            sequence,
            MsgType::KEEPALIVE_REQ.code(),
            payload,
        ))]
    }

    /// Complete, with [`WaiterOutcome::Timeout`], every waiter whose deadline
    /// has passed. Call alongside [`Session::tick`].
    pub fn expire_deadlines(&mut self, now: I) {
        let expired: Vec<CorrelationKey> = self
            .waiters
            .iter()
            .filter(|(_, waiter)| waiter.deadline.is_some_and(|deadline| now >= deadline))
            .map(|(key, _)| *key)
            .collect();

        for key in expired {
            if let Some(waiter) = self.waiters.remove(&key) {
                let _ = waiter.sender.send(WaiterOutcome::Timeout);
            }
        }
    }

    /// Tear the session down, completing every pending waiter and
    /// subscription with `cause` (or [`SessionError::Cancelled`] if `None`).
    /// Idempotent past [`SessionState::Closed`].
    pub fn close(&mut self, cause: Option<SessionError>) -> Vec<SessionAction> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }

        self.state = SessionState::Closing;
        for (_, waiter) in self.waiters.drain() {
            let outcome = WaiterOutcome::SessionClosed(cause.clone().unwrap_or(SessionError::Cancelled));
            let _ = waiter.sender.send(outcome);
        }
        self.subscriptions.clear();
        self.state = SessionState::Closed;

        vec![SessionAction::Close {
            reason: cause.map_or_else(|| "closed by user".to_owned(), |err| err.to_string()),
        }]
    }
}
