use std::net::SocketAddr;
use std::path::PathBuf;

/// Process-fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to load TLS credentials (cert {cert}, key {key}): {source}")]
    Tls {
        cert: PathBuf,
        key: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
