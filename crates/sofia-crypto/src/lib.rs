//! Sofia device login password hashing.
//!
//! Pure, deterministic functions with no I/O or global state, matching the
//! algorithm every Sofia-speaking device expects a client to reproduce
//! locally before sending `LOGIN_REQ`.
//!
//! # Algorithm
//!
//! ```text
//! password bytes
//!        │
//!        ▼
//! MD5 digest (16 bytes)
//!        │
//!        ▼
//! pairwise byte addition mod 256 -> 8 bytes
//!        │
//!        ▼
//! base62 alphabet mapping -> 8-character hash string
//! ```
//!
//! The reduction step folds the 16-byte MD5 digest pairwise: byte `2*i` and
//! byte `2*i + 1` are summed modulo 256, producing 8 output bytes. Each
//! output byte then indexes into a fixed 62-character alphabet to produce
//! the final printable hash.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sofia_hash;

pub use sofia_hash::hash_password;
