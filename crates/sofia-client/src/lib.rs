//! Client
//!
//! TCP client and `Recorder` facade for the Sofia/NetSurveillance DVR
//! protocol (Dahua/XMeye-family analog and IP DVR/NVR devices).
//!
//! # Architecture
//!
//! [`sofia_core::Session`] is a pure state machine with no socket of its
//! own. This crate supplies the missing half: a `tokio::net::TcpStream`
//! read/write loop ([`transport`]) that decodes frames with
//! [`sofia_proto::FrameDecoder`], drives the session, and executes the
//! actions it returns. [`Recorder`] is the thin, cloneable handle users
//! actually hold: each of its methods is a short policy over the session
//! (build request JSON, register a waiter or subscription, wait for the
//! reply) matching the operation table in the protocol's external
//! interface documentation.
//!
//! # Components
//!
//! - [`Recorder`]: host-facing handle — login, one-shot requests,
//!   subscriptions, `close()`
//! - [`AlarmSubscription`]: parsed alarm/event pushes
//! - [`MediaSubscription`]: raw live-video / remote-playback container bytes;
//!   feed these through [`sofia_stream::CapturedStreamParser`] to demultiplex
//! - [`ClientError`]: the facade's error type

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod recorder;
mod transport;

pub use error::ClientError;
pub use recorder::{format_timestamp, AlarmEvent, AlarmSubscription, MediaChunk, MediaSubscription, Recorder};
