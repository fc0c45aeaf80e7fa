/// Errors raised while decoding requests or encoding replies.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed request: {0}")]
    MalformedRequest(serde_json::Error),
    #[error("failed to encode reply: {0}")]
    Encode(serde_json::Error),
}

impl WireError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::Encode(_) => "encode",
        }
    }
}

/// A raw leap indicator outside the two-bit NTP range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("leap indicator {0} is out of range")]
pub struct InvalidLeapIndicator(pub u8);
