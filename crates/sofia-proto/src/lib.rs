//! Wire framing and JSON payload helpers for the Sofia/NetSurveillance DVR
//! protocol.
//!
//! This crate is purely sans-IO: it knows how to turn bytes into [`Frame`]s
//! and back, and how to encode/decode the JSON payloads carried by control
//! frames. It has no notion of sockets, sessions, or device state — that
//! lives in the core crate built on top of it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod header;
pub mod json;
pub mod msg_type;

pub use errors::ProtocolError;
pub use frame::{Frame, FrameDecoder};
pub use header::FrameHeader;
pub use json::{decode_json_payload, encode_json_payload, JSON_TRAILER};
pub use msg_type::MsgType;
