//! TCP transport: the I/O task that owns the socket and drives a
//! [`Session`].
//!
//! Sofia runs over a single persistent TCP connection (no multiplexed
//! streams, no TLS). One task reads the socket, feeds bytes through a
//! [`FrameDecoder`], and pushes each decoded frame through
//! [`Session::handle_inbound`]; the same task owns the write half and is
//! the only place that ever writes to the socket, so outbound frames from
//! concurrent `Recorder` calls are serialized through an mpsc channel
//! rather than racing on the socket directly.

use std::{sync::Arc, time::Duration};

use sofia_core::{Session, SessionAction, SessionError, SessionState};
use sofia_proto::{Frame, FrameDecoder};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{mpsc, Mutex},
};

use crate::error::ClientError;

/// How often the I/O task calls [`Session::tick`] and
/// [`Session::expire_deadlines`].
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Current time, as seen by the session's clock.
pub(crate) fn now() -> std::time::Instant {
    std::time::Instant::now()
}

/// A deadline `d` in the future, suitable for a one-shot request timeout.
pub(crate) fn deadline_after(d: Duration) -> std::time::Instant {
    now() + d
}

/// Shared handle to a running connection's session and outbound queue.
///
/// Cloning shares the same underlying session and socket; every clone talks
/// to the same device connection.
#[derive(Clone, Debug)]
pub(crate) struct Connection {
    pub(crate) session: Arc<Mutex<Session<std::time::Instant>>>,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl Connection {
    /// Open a TCP connection and spawn the task that drives it.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] if the TCP connect fails.
    pub(crate) async fn connect(addr: impl tokio::net::ToSocketAddrs) -> std::io::Result<Self> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;

        let session = Arc::new(Mutex::new(Session::new()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_io_task(socket, Arc::clone(&session), outbound_rx));

        Ok(Self { session, outbound: outbound_tx })
    }

    /// Execute a [`SessionAction`] produced outside the I/O task (by a
    /// `Recorder` method holding the session lock).
    ///
    /// `SendFrame` is queued onto the outbound channel; `Close` just drops
    /// the sender, which ends the I/O task's select loop on its next turn.
    pub(crate) fn execute(&self, action: SessionAction) -> Result<(), ClientError> {
        match action {
            SessionAction::SendFrame(frame) => {
                self.outbound.send(frame).map_err(|_| ClientError::ConnectionClosed)
            }
            SessionAction::Close { .. } => Ok(()),
        }
    }
}

async fn run_io_task(
    mut socket: TcpStream,
    session: Arc<Mutex<Session<std::time::Instant>>>,
    mut outbound_rx: mpsc::UnboundedReceiver<Frame>,
) {
    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; READ_BUFFER_SIZE];
    let mut maintenance = tokio::time::interval(MAINTENANCE_INTERVAL);
    let mut encode_buf = Vec::new();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(frame) = outbound else {
                    tracing::debug!("outbound channel closed, shutting down I/O task");
                    break;
                };
                encode_buf.clear();
                frame.encode(&mut encode_buf);
                if let Err(err) = socket.write_all(&encode_buf).await {
                    close_session(&session, SessionError::Transport(err.to_string())).await;
                    break;
                }
            }

            read_result = socket.read(&mut read_buf) => {
                match read_result {
                    Ok(0) => {
                        close_session(&session, SessionError::Transport("connection closed by peer".to_owned())).await;
                        break;
                    }
                    Ok(n) => {
                        decoder.feed(&read_buf[..n]);
                        if !drain_frames(&mut decoder, &session, &mut socket).await {
                            break;
                        }
                    }
                    Err(err) => {
                        close_session(&session, SessionError::Transport(err.to_string())).await;
                        break;
                    }
                }
            }

            _ = maintenance.tick() => {
                let actions = {
                    let mut guard = session.lock().await;
                    guard.expire_deadlines(std::time::Instant::now());
                    guard.tick(std::time::Instant::now())
                };
                if !execute_locally(&actions, &mut socket).await {
                    break;
                }
                if session.lock().await.state() == SessionState::Closed {
                    break;
                }
            }
        }
    }
}

/// Decode every complete frame currently buffered, route each through
/// [`Session::handle_inbound`], and execute any resulting actions directly
/// on the socket (this task is the owning writer). Returns `false` if the
/// task should stop.
async fn drain_frames(
    decoder: &mut FrameDecoder,
    session: &Arc<Mutex<Session<std::time::Instant>>>,
    socket: &mut TcpStream,
) -> bool {
    loop {
        match decoder.next_frame() {
            Ok(Some(frame)) => {
                let result = {
                    let mut guard = session.lock().await;
                    guard.handle_inbound(frame, std::time::Instant::now())
                };
                match result {
                    Ok(actions) => {
                        if !execute_locally(&actions, socket).await {
                            return false;
                        }
                    }
                    Err(err) => {
                        close_session(session, err).await;
                        return false;
                    }
                }
            }
            Ok(None) => return true,
            Err(err) => {
                close_session(session, err.into()).await;
                return false;
            }
        }
    }
}

/// Write out `SendFrame` actions directly (used when the I/O task itself
/// produces them, e.g. keep-alive ticks and login replies). Returns `false`
/// once a `Close` action is seen.
async fn execute_locally(actions: &[SessionAction], socket: &mut TcpStream) -> bool {
    let mut buf = Vec::new();
    for action in actions {
        match action {
            SessionAction::SendFrame(frame) => {
                buf.clear();
                frame.encode(&mut buf);
                if socket.write_all(&buf).await.is_err() {
                    return false;
                }
            }
            SessionAction::Close { reason } => {
                tracing::debug!(reason, "closing connection");
                return false;
            }
        }
    }
    true
}

async fn close_session(session: &Arc<Mutex<Session<std::time::Instant>>>, cause: SessionError) {
    let actions = session.lock().await.close(Some(cause));
    for action in actions {
        if let SessionAction::Close { reason } = action {
            tracing::debug!(reason, "session closed");
        }
    }
}
