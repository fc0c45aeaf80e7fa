use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use uhr_server::{parse_listen_addr, ServerConfig, TlsPaths};
use uhr_telemetry::{LogFormat, TelemetryConfig};

/// How long open sessions get to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Secure WebSocket time service. Every request is answered with a fresh
/// NTP reading and the reference's leap-second status.
#[derive(Debug, Parser)]
#[command(name = "uhr", version)]
struct Cli {
    /// Listen address; an empty host (":8123") means all interfaces.
    #[arg(long, env = "UHR_ADDR", default_value = uhr_server::config::DEFAULT_ADDR)]
    addr: String,

    /// PEM certificate chain.
    #[arg(long, env = "UHR_CERT")]
    cert: PathBuf,

    /// PEM private key.
    #[arg(long, env = "UHR_KEY")]
    key: PathBuf,

    /// NTP host queried on every client request.
    #[arg(long, env = "UHR_NTP_HOST", default_value = uhr_ntp::DEFAULT_NTP_HOST)]
    ntp_host: String,

    /// Directory served on every path other than /time.
    #[arg(long, env = "UHR_STATIC_DIR", default_value = ".")]
    static_dir: PathBuf,

    /// Origin allowed to open /time (repeatable). Any origin when omitted.
    #[arg(long = "allowed-origin", env = "UHR_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,

    /// Log output: pretty or json.
    #[arg(long, env = "UHR_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Expose Prometheus metrics at /metrics.
    #[arg(long, env = "UHR_METRICS")]
    metrics: bool,
}

impl Cli {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::new(TlsPaths {
            cert: self.cert.clone(),
            key: self.key.clone(),
        });
        config.listen_addr = parse_listen_addr(&self.addr)?;
        config.ntp_host = self.ntp_host.clone();
        config.static_dir = self.static_dir.clone();
        config.allowed_origins = self.allowed_origins.clone();
        config.metrics_enabled = self.metrics;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    uhr_telemetry::init_telemetry(&TelemetryConfig {
        format: cli.log_format,
        ..TelemetryConfig::default()
    })?;

    let config = cli.server_config().context("invalid configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting uhr time server");

    let handle = uhr_server::start(config)
        .await
        .context("server failed to start")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    handle.shutdown(SHUTDOWN_GRACE);
    handle.wait().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["uhr", "--cert", "c.pem", "--key", "k.pem"]).unwrap();
        let config = cli.server_config().unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8123".parse().unwrap());
        assert_eq!(config.ntp_host, "ntp.time.nl");
        assert_eq!(config.static_dir, PathBuf::from("."));
        assert!(config.allowed_origins.is_empty());
        assert!(!config.metrics_enabled);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn tls_credentials_are_required() {
        assert!(Cli::try_parse_from(["uhr"]).is_err());
        assert!(Cli::try_parse_from(["uhr", "--cert", "c.pem"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "uhr",
            "--cert",
            "c.pem",
            "--key",
            "k.pem",
            "--addr",
            "127.0.0.1:9443",
            "--ntp-host",
            "pool.ntp.org",
            "--allowed-origin",
            "https://a.example",
            "--allowed-origin",
            "https://b.example",
            "--log-format",
            "json",
            "--metrics",
        ])
        .unwrap();
        let config = cli.server_config().unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9443".parse().unwrap());
        assert_eq!(config.ntp_host, "pool.ntp.org");
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert!(config.metrics_enabled);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_address_is_a_config_error() {
        let cli = Cli::try_parse_from(["uhr", "--cert", "c", "--key", "k", "--addr", "nowhere"]).unwrap();
        assert!(cli.server_config().is_err());
    }
}
