//! JSON payload encoding for control-plane frames.
//!
//! Every JSON payload on the wire is terminated by the two bytes `\n\0`
//! (newline then NUL). Devices require the trailer on requests and always
//! include it on responses; callers decoding a payload should tolerate a
//! missing trailer (truncated device firmware quirks are common) but callers
//! encoding one must always append it.

use bytes::{Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::ProtocolError;

/// Trailer appended to every JSON payload: newline then NUL.
pub const JSON_TRAILER: &[u8; 2] = b"\n\0";

/// Serialize `value` to JSON and append the `\n\0` trailer, ready to hand to
/// [`crate::frame::Frame::new`] as a payload.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidJson`] if `value` cannot be serialized.
pub fn encode_json_payload<T: Serialize>(value: &T) -> Result<Bytes, ProtocolError> {
    let body = serde_json::to_vec(value).map_err(|err| ProtocolError::InvalidJson(err.to_string()))?;
    let mut buf = BytesMut::with_capacity(body.len() + JSON_TRAILER.len());
    buf.extend_from_slice(&body);
    buf.extend_from_slice(JSON_TRAILER);
    Ok(buf.freeze())
}

/// Parse a JSON payload, trimming a trailing `\n\0` (or bare `\0`, or bare
/// `\n`) if present before handing the rest to `serde_json`.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidJson`] if the trimmed bytes are not valid
/// JSON for `T`.
pub fn decode_json_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    let trimmed = trim_trailer(payload);
    serde_json::from_slice(trimmed).map_err(|err| ProtocolError::InvalidJson(err.to_string()))
}

fn trim_trailer(payload: &[u8]) -> &[u8] {
    if let Some(stripped) = payload.strip_suffix(JSON_TRAILER.as_slice()) {
        return stripped;
    }
    if let Some(stripped) = payload.strip_suffix(b"\0") {
        return stripped;
    }
    if let Some(stripped) = payload.strip_suffix(b"\n") {
        return stripped;
    }
    payload
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Login {
        #[serde(rename = "UserName")]
        user_name: String,
        #[serde(rename = "PassWord")]
        password: String,
    }

    #[test]
    fn encode_appends_trailer() {
        let value = json!({ "Ret": 100 });
        let payload = encode_json_payload(&value).expect("encode");
        assert!(payload.ends_with(JSON_TRAILER));
    }

    #[test]
    fn decode_strips_full_trailer() {
        let mut bytes = serde_json::to_vec(&json!({ "Ret": 100 })).unwrap();
        bytes.extend_from_slice(JSON_TRAILER);
        let value: serde_json::Value = decode_json_payload(&bytes).expect("decode");
        assert_eq!(value["Ret"], 100);
    }

    #[test]
    fn decode_tolerates_missing_trailer() {
        let bytes = serde_json::to_vec(&json!({ "Ret": 100 })).unwrap();
        let value: serde_json::Value = decode_json_payload(&bytes).expect("decode");
        assert_eq!(value["Ret"], 100);
    }

    #[test]
    fn round_trips_typed_struct() {
        let login = Login { user_name: "admin".to_owned(), password: "6QNMIQGe".to_owned() };
        let payload = encode_json_payload(&login).expect("encode");
        let decoded: Login = decode_json_payload(&payload).expect("decode");
        assert_eq!(decoded, login);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let bytes = b"not json\n\0";
        let result: Result<serde_json::Value, _> = decode_json_payload(bytes);
        assert!(matches!(result, Err(ProtocolError::InvalidJson(_))));
    }
}
