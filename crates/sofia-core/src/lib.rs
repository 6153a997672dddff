//! Session layer for the Sofia/NetSurveillance DVR protocol: the login
//! handshake, keep-alive timer, outbound sequencing, and inbound routing to
//! one-shot waiters and long-lived subscriptions.
//!
//! This crate has no socket of its own; it is the pure state machine that
//! `sofia-client`'s I/O task drives.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod correlation;
pub mod env;
pub mod error;
pub mod session;

pub use correlation::{CorrelationKey, SubscriptionHandle, WaiterOutcome};
pub use env::{Environment, SystemEnvironment};
pub use error::SessionError;
pub use session::{CorrelationKeySpec, Session, SessionAction, SessionState, DEFAULT_REQUEST_TIMEOUT};
