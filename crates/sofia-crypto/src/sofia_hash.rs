//! The Sofia password digest algorithm.

use md5::{Digest, Md5};

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Derive the 8-character password digest sent as `PassWord` in `LOGIN_REQ`.
///
/// Computes the 16-byte MD5 digest of `password`, reduces it to 8 bytes by
/// pairwise addition of adjacent bytes modulo 256, then maps each byte to an
/// ASCII character via `byte % 62` into a fixed base62 alphabet.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let digest = Md5::digest(password.as_bytes());

    let mut reduced = [0u8; 8];
    for (i, slot) in reduced.iter_mut().enumerate() {
        let lo = u16::from(digest[2 * i]);
        let hi = u16::from(digest[2 * i + 1]);
        *slot = ((lo + hi) % 256) as u8;
    }

    reduced.iter().map(|&byte| ALPHABET[usize::from(byte) % ALPHABET.len()] as char).collect()
}
