use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::WireError;
use crate::leap::LeapStatus;

/// Inbound request: an opaque client counter that is echoed back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// A missing counter decodes as zero.
    #[serde(rename = "c", default)]
    pub sequence: f64,
}

impl ClientRequest {
    pub fn new(sequence: f64) -> Self {
        Self { sequence }
    }

    /// Decode a request from a text or binary frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(payload).map_err(WireError::MalformedRequest)
    }
}

/// Outbound reply sent once per valid request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerReply {
    #[serde(rename = "c")]
    pub sequence: f64,
    /// Unix time in milliseconds, sub-millisecond precision kept.
    #[serde(rename = "s")]
    pub server_time_ms: f64,
    /// Reserved for a latency/error estimate. Always zero for now.
    #[serde(rename = "e")]
    pub error_estimate: f64,
    #[serde(rename = "l")]
    pub leap: LeapStatus,
}

impl ServerReply {
    pub fn new(request: &ClientRequest, server_time_ms: f64, leap: LeapStatus) -> Self {
        Self {
            sequence: request.sequence,
            server_time_ms,
            error_estimate: 0.0,
            leap,
        }
    }

    pub fn encode(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Encode)
    }
}

/// Milliseconds since the Unix epoch, including the fractional part.
pub fn unix_millis(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 * 1_000.0 + f64::from(time.timestamp_subsec_nanos()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_request() {
        let req = ClientRequest::decode(br#"{"c": 42}"#).unwrap();
        assert_eq!(req.sequence, 42.0);

        let req = ClientRequest::decode(br#"{"c": 0.1234567890123}"#).unwrap();
        assert_eq!(req.sequence, 0.1234567890123);
    }

    #[test]
    fn decode_ignores_unknown_fields_and_defaults_counter() {
        let req = ClientRequest::decode(br#"{"c": 3, "extra": true}"#).unwrap();
        assert_eq!(req.sequence, 3.0);

        let req = ClientRequest::decode(b"{}").unwrap();
        assert_eq!(req.sequence, 0.0);
    }

    #[test]
    fn decode_rejects_garbage() {
        for payload in [&b"hello"[..], b"", br#"{"c": "nope"}"#, b"[1, 2]", br#"{"c": 1"#] {
            let err = ClientRequest::decode(payload).unwrap_err();
            assert_eq!(err.error_kind(), "malformed_request");
        }
    }

    #[test]
    fn reply_uses_short_field_names() {
        let reply = ServerReply::new(&ClientRequest::new(7.5), 1_700_000_000_123.25, LeapStatus::AddSecond);
        let value: serde_json::Value = serde_json::from_str(&reply.encode().unwrap()).unwrap();

        assert_eq!(value["c"], 7.5);
        assert_eq!(value["s"], 1_700_000_000_123.25);
        assert_eq!(value["e"], 0.0);
        assert_eq!(value["l"], 1);
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn reply_echoes_counter_exactly() {
        for sequence in [0.0, -1.0, 42.0, 1e300, 0.1 + 0.2, 1_700_000_000_123.456] {
            let reply = ServerReply::new(&ClientRequest::new(sequence), 0.0, LeapStatus::NoWarning);
            let decoded: ServerReply = serde_json::from_str(&reply.encode().unwrap()).unwrap();
            assert_eq!(decoded.sequence.to_bits(), sequence.to_bits());
        }
    }

    #[test]
    fn unix_millis_keeps_fraction() {
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let millis = unix_millis(time);
        assert!((millis - 1_700_000_000_123.456_789).abs() < 1e-3);
        assert!(millis.fract() > 0.4);
    }

    #[test]
    fn unix_millis_at_epoch() {
        assert_eq!(unix_millis(DateTime::UNIX_EPOCH), 0.0);
    }
}
