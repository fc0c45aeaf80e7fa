use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use uhr_ntp::DEFAULT_NTP_HOST;

use crate::errors::ServerError;

/// Listen address used when none is configured.
pub const DEFAULT_ADDR: &str = ":8123";

/// Certificate chain and private key, both PEM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub tls: TlsPaths,
    pub ntp_host: String,
    /// Directory served on every path other than `/time`.
    pub static_dir: PathBuf,
    /// Origins allowed to upgrade. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// Defaults for everything except the TLS credentials.
    pub fn new(tls: TlsPaths) -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8123),
            tls,
            ntp_host: DEFAULT_NTP_HOST.to_string(),
            static_dir: PathBuf::from("."),
            allowed_origins: Vec::new(),
            metrics_enabled: false,
        }
    }
}

/// Parse a listen address. An empty host (`:8123`) means all interfaces.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    let invalid = |reason: String| ServerError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };

    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|e| invalid(format!("bad port: {e}")))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    addr.parse().map_err(|e| invalid(format!("{e}")))
}
