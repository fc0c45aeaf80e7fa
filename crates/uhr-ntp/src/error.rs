use std::time::Duration;

/// Why an upstream time query produced no usable sample.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid reply: {0}")]
    InvalidReply(String),
}

impl QueryError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network_error",
            Self::InvalidReply(_) => "invalid_reply",
        }
    }
}
