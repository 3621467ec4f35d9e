//! Cursor encoding/decoding
//!
//! A cursor is the base64 form of the ordering-field value at a page
//! boundary. It carries neither the field name nor a version; the caller
//! knows which field is active and parses the payload accordingly.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};

use super::order::KeyKind;
use crate::store::Value;
use crate::ApiError;

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> crate::Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| ApiError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ApiError::InvalidCursor(e.to_string()))
    }

    /// Encode a field value. `None` for values that cannot mark a position.
    pub fn encode_value(value: &Value) -> Option<String> {
        canonical(value).map(|payload| Self::encode(&payload))
    }

    /// Decode a cursor into a value of the active field's kind.
    pub fn decode_value(cursor: &str, kind: KeyKind) -> crate::Result<Value> {
        let payload = Self::decode(cursor)?;
        parse_canonical(&payload, kind)
    }
}

/// Canonical string form of an ordering value.
///
/// Timestamps use ISO-8601 with milliseconds and a `Z` suffix, integers
/// their decimal form, text is taken as is.
pub fn canonical(value: &Value) -> Option<String> {
    match value {
        Value::Timestamp(at) => Some(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Int(number) => Some(number.to_string()),
        Value::Text(text) => Some(text.clone()),
        Value::Id(id) => Some(id.to_string()),
        Value::Null | Value::Bool(_) | Value::List(_) => None,
    }
}

/// Parses a canonical payload back into a typed value.
pub fn parse_canonical(payload: &str, kind: KeyKind) -> crate::Result<Value> {
    match kind {
        KeyKind::Timestamp => DateTime::parse_from_rfc3339(payload)
            .map(|at| Value::Timestamp(at.with_timezone(&Utc)))
            .map_err(|e| ApiError::InvalidCursor(format!("expected a timestamp: {e}"))),
        KeyKind::Integer => payload
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ApiError::InvalidCursor(format!("expected an integer: {e}"))),
        KeyKind::Text => Ok(Value::Text(payload.to_string())),
    }
}
