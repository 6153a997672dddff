//! [`Recorder`]: the host-facing facade over a Sofia session.
//!
//! Each method is a thin policy on top of [`sofia_core::Session`]: build the
//! request JSON, register a waiter or subscription, hand the resulting
//! frame to the I/O task, and translate the reply.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{json, Value};
use sofia_core::{CorrelationKeySpec, Session, SessionAction, SubscriptionHandle, DEFAULT_REQUEST_TIMEOUT};
use sofia_proto::{decode_json_payload, MsgType};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{
    error::{resolve_outcome, ClientError},
    transport::{self, Connection},
};

/// A logged-in connection to a Sofia/NetSurveillance device.
///
/// Cheap to clone: every clone shares the same underlying TCP connection and
/// session. Dropping the last clone does not close the connection; call
/// [`Recorder::close`] explicitly.
#[derive(Clone, Debug)]
pub struct Recorder {
    connection: Connection,
}

impl Recorder {
    /// Connect to `addr` and perform the login handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the TCP connect fails, or
    /// [`ClientError::Remote`] if the device rejects the credentials.
    pub async fn connect_and_login(
        addr: impl tokio::net::ToSocketAddrs,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let connection = Connection::connect(addr).await?;
        {
            let mut session = connection.session.lock().await;
            session.connect()?;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let action = {
            let mut session = connection.session.lock().await;
            let now = transport::now();
            let deadline = Some(transport::deadline_after(DEFAULT_REQUEST_TIMEOUT));
            session.send_login_request(username, password, now, deadline, reply_tx)?
        };
        connection.execute(action)?;

        let outcome = reply_rx.await.map_err(|_| ClientError::ConnectionClosed)?;
        resolve_outcome(outcome)?;

        Ok(Self { connection })
    }

    async fn session_id_hex(&self) -> String {
        let session_id = self.connection.session.lock().await.session_id();
        format!("0x{session_id:x}")
    }

    /// Issue a one-shot request and await its typed reply payload.
    async fn request(
        &self,
        key_spec: CorrelationKeySpec,
        msg_type: u16,
        body: &impl serde::Serialize,
    ) -> Result<Bytes, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let action = {
            let mut session = self.connection.session.lock().await;
            let now = transport::now();
            let deadline = Some(transport::deadline_after(DEFAULT_REQUEST_TIMEOUT));
            session.send_request(key_spec, msg_type, body, now, deadline, reply_tx)?
        };
        self.connection.execute(action)?;

        let outcome = reply_rx.await.map_err(|_| ClientError::ConnectionClosed)?;
        resolve_outcome(outcome)
    }

    /// Fetch the device's channel names (`ChannelTitle` in `General.General`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedReply`] if `ChannelTitle` is missing
    /// or not an array of strings.
    pub async fn get_channel_names(&self) -> Result<Vec<String>, ClientError> {
        let session_id = self.session_id_hex().await;
        let body = json!({ "Name": "ChannelTitle", "SessionID": session_id });
        let payload = self
            .request(CorrelationKeySpec::ByType(MsgType::CONFIG_RSP.code()), MsgType::CONFIG_REQ.code(), &body)
            .await?;

        let value: Value = decode_json_payload(&payload)?;
        let names = value
            .get("ChannelTitle")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::MalformedReply("missing ChannelTitle array".to_owned()))?;

        names
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| ClientError::MalformedReply("ChannelTitle entry not a string".to_owned()))
            })
            .collect()
    }

    /// Read a named configuration section, returning its name echoed back and
    /// the raw JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Session`] wrapping [`sofia_core::SessionError::Conflict`]
    /// if another `getConfig`/`getChannelNames`/`getSysInfo` call is already
    /// in flight (they share a reply type).
    pub async fn get_config(&self, name: &str) -> Result<(String, Value), ClientError> {
        let session_id = self.session_id_hex().await;
        let body = json!({ "Name": name, "SessionID": session_id });
        let payload = self
            .request(CorrelationKeySpec::ByType(MsgType::CONFIG_RSP.code()), MsgType::CONFIG_REQ.code(), &body)
            .await?;
        named_object_reply(&payload, name)
    }

    /// Query a named system information section.
    ///
    /// # Errors
    ///
    /// See [`Recorder::get_config`].
    pub async fn get_sys_info(&self, name: &str) -> Result<(String, Value), ClientError> {
        let session_id = self.session_id_hex().await;
        let body = json!({ "Name": name, "SessionID": session_id });
        let payload = self
            .request(CorrelationKeySpec::ByType(MsgType::SYSINFO_RSP.code()), MsgType::SYSINFO_REQ.code(), &body)
            .await?;
        named_object_reply(&payload, name)
    }

    /// Capture a still picture from `channel`, returning the binary JPEG
    /// payload of the `SNAP_RSP` reply.
    ///
    /// # Errors
    ///
    /// See [`Recorder::get_config`].
    pub async fn capture_picture(&self, channel: i64) -> Result<Bytes, ClientError> {
        let body = json!({ "Name": "OPSNAP", "OPSNAP": { "Channel": channel } });
        self.request(CorrelationKeySpec::ByType(MsgType::SNAP_RSP.code()), MsgType::SNAP_REQ.code(), &body).await
    }

    /// Subscribe to alarm/event pushes.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError::Session`] wrapping [`sofia_core::SessionError::Conflict`]
    /// if already subscribed.
    pub async fn monitor_alarms(&self) -> Result<AlarmSubscription, ClientError> {
        let session_id = self.session_id_hex().await;
        let body = json!({ "Name": "OPGUARD", "SessionID": session_id });
        let (handle, receiver) = self.subscribe(MsgType::GUARD_RSP.code(), MsgType::GUARD_REQ.code(), &body).await?;
        Ok(AlarmSubscription { handle, receiver, session: Arc::clone(&self.connection.session) })
    }

    /// Claim a channel's live video feed. Yields raw Captured-Stream
    /// container bytes per push; feed them through
    /// [`sofia_stream::CapturedStreamParser`] to demultiplex I/P-frame,
    /// audio, and metadata chunks.
    ///
    /// # Errors
    ///
    /// See [`Recorder::monitor_alarms`].
    pub async fn receive_live_video(&self, channel: i64) -> Result<MediaSubscription, ClientError> {
        let body = json!({
            "Name": "OPMonitor",
            "OPMonitor": {
                "Action": "Claim",
                "Parameter": { "Channel": channel, "CombinMode": "NONE", "StreamType": "Main", "TransMode": "TCP" },
            },
        });
        let (handle, receiver) = self.subscribe(MsgType::MONITOR_RSP.code(), MsgType::MONITOR_REQ.code(), &body).await?;
        Ok(MediaSubscription { handle, receiver, session: Arc::clone(&self.connection.session) })
    }

    /// Claim remote playback of a recorded file between `start_time` and
    /// `end_time` (device-local `"YYYY-MM-DD hh:mm:ss"`, see
    /// [`format_timestamp`]). Yields raw Captured-Stream container bytes per
    /// push, same as [`Recorder::receive_live_video`].
    ///
    /// # Errors
    ///
    /// See [`Recorder::monitor_alarms`].
    pub async fn receive_remote_playback(
        &self,
        start_time: &str,
        end_time: &str,
        file_name: &str,
    ) -> Result<MediaSubscription, ClientError> {
        let body = json!({
            "Name": "OPPlayBack",
            "OPPlayBack": {
                "Action": "Claim",
                "Parameter": { "StartTime": start_time, "EndTime": end_time, "FileName": file_name, "TransMode": "TCP" },
            },
        });
        let (handle, receiver) = self.subscribe(MsgType::PLAYBACK_RSP.code(), MsgType::PLAYBACK_REQ.code(), &body).await?;
        Ok(MediaSubscription { handle, receiver, session: Arc::clone(&self.connection.session) })
    }

    async fn subscribe(
        &self,
        msg_type: u16,
        claim_msg_type: u16,
        body: &impl serde::Serialize,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<Bytes>), ClientError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (handle, action) = {
            let mut session = self.connection.session.lock().await;
            let now = transport::now();
            session.subscribe_and_send(msg_type, claim_msg_type, body, now, sender)?
        };
        self.connection.execute(action)?;
        Ok((handle, receiver))
    }

    /// Tear down the session, completing every pending request and
    /// subscription with `Cancelled`.
    pub async fn close(&self) {
        let actions = self.connection.session.lock().await.close(None);
        for action in actions {
            if let SessionAction::Close { reason } = action {
                tracing::debug!(reason, "recorder closed by caller");
            }
        }
    }
}

fn named_object_reply(payload: &Bytes, requested_name: &str) -> Result<(String, Value), ClientError> {
    let value: Value = decode_json_payload(payload)?;
    let name = value.get("Name").and_then(Value::as_str).unwrap_or(requested_name).to_owned();
    Ok((name, value))
}

/// Live alarm/event notification.
pub struct AlarmEvent {
    /// Channel index the event occurred on, if present in the payload.
    pub channel: Option<i64>,
    /// `true` if this is an event-start notification, `false` if an
    /// event-end notification.
    pub is_start: bool,
    /// Device-reported event type (e.g. `"VideoMotion"`), if present.
    pub event_type: Option<String>,
    /// The raw decoded JSON payload, for fields this type doesn't surface.
    pub raw: Value,
}

/// Handle to an active alarm subscription. Dropping this without calling
/// [`AlarmSubscription::close`] leaves the subscription registered until the
/// session notices the receiver is gone on its next push.
pub struct AlarmSubscription {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<Bytes>,
    session: Arc<Mutex<Session<std::time::Instant>>>,
}

impl AlarmSubscription {
    /// Await the next alarm event, or `None` once the subscription closes.
    pub async fn next(&mut self) -> Option<AlarmEvent> {
        let payload = self.receiver.recv().await?;
        let raw: Value = decode_json_payload(&payload).ok()?;
        let channel = raw.get("Channel").and_then(Value::as_i64);
        let event_type = raw.get("Name").or_else(|| raw.get("EventType")).and_then(Value::as_str).map(str::to_owned);
        let is_start = raw.get("Action").and_then(Value::as_str).is_none_or(|action| action != "Stop");
        Some(AlarmEvent { channel, is_start, event_type, raw })
    }

    /// Unsubscribe. Idempotent.
    pub async fn close(&self) {
        self.session.lock().await.unsubscribe(&self.handle);
    }
}

/// Handle to an active live-video or remote-playback subscription, yielding
/// raw Captured-Stream container bytes per push.
pub struct MediaSubscription {
    handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<Bytes>,
    session: Arc<Mutex<Session<std::time::Instant>>>,
}

impl MediaSubscription {
    /// Await the next pushed chunk of container bytes, or `None` once the
    /// subscription closes.
    pub async fn next(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Await the next push and demultiplex it through `parser`, returning
    /// the I/P-frame, audio, and metadata slices it yielded.
    ///
    /// `parser` is the caller's, kept alive across calls on this
    /// subscription: a single chunk's payload may span more than one push,
    /// so a fresh parser per call would lose that continuation.
    ///
    /// # Errors
    ///
    /// Returns [`sofia_stream::StreamError`] if the pushed bytes contain an
    /// unrecognized chunk magic or an oversized declared length.
    pub async fn next_demuxed(
        &mut self,
        parser: &mut sofia_stream::CapturedStreamParser,
    ) -> Option<Result<Vec<MediaChunk>, sofia_stream::StreamError>> {
        let payload = self.receiver.recv().await?;
        let mut sink = CollectingSink::default();
        Some(parser.feed(&payload, &mut sink).map(|()| sink.0))
    }

    /// Unsubscribe. Idempotent.
    pub async fn close(&self) {
        self.session.lock().await.unsubscribe(&self.handle);
    }
}

/// One demultiplexed slice of a live-video or remote-playback push, as
/// produced by [`MediaSubscription::next_demuxed`].
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Which container chunk kind this slice belongs to.
    pub kind: sofia_stream::ChunkKind,
    /// The chunk's payload bytes, stripped of its container header. May be
    /// only part of the full chunk if it was split across pushes.
    pub bytes: Bytes,
}

#[derive(Default)]
struct CollectingSink(Vec<MediaChunk>);

impl sofia_stream::ChunkSink for CollectingSink {
    fn on_i_frame(&mut self, bytes: &[u8]) {
        self.0.push(MediaChunk { kind: sofia_stream::ChunkKind::IFrame, bytes: Bytes::copy_from_slice(bytes) });
    }

    fn on_p_frame(&mut self, bytes: &[u8]) {
        self.0.push(MediaChunk { kind: sofia_stream::ChunkKind::PFrame, bytes: Bytes::copy_from_slice(bytes) });
    }

    fn on_audio(&mut self, bytes: &[u8]) {
        self.0.push(MediaChunk { kind: sofia_stream::ChunkKind::Audio, bytes: Bytes::copy_from_slice(bytes) });
    }

    fn on_metadata(&mut self, bytes: &[u8]) {
        self.0.push(MediaChunk { kind: sofia_stream::ChunkKind::Metadata, bytes: Bytes::copy_from_slice(bytes) });
    }
}

/// Format an instant as the device-local `"YYYY-MM-DD hh:mm:ss"` string
/// Sofia expects for playback `StartTime`/`EndTime`.
///
/// Takes the caller's already-zoned timestamp rather than assuming the
/// host's local zone matches the device's, since the device's zone is not
/// otherwise discoverable over this protocol.
#[must_use]
pub fn format_timestamp<Tz: chrono::TimeZone>(instant: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.format("%Y-%m-%d %H:%M:%S").to_string()
}
