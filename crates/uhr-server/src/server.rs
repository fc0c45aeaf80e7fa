use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uhr_ntp::TimeReference;

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::metrics as m;
use crate::origin::{policy_for, OriginPolicy};
use crate::session;

/// Shared application state passed to Axum handlers. Read-only.
#[derive(Clone)]
pub struct AppState {
    pub reference: Arc<TimeReference>,
    pub origin_policy: Arc<dyn OriginPolicy>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(reference: TimeReference, origin_policy: Arc<dyn OriginPolicy>) -> Self {
        Self {
            reference: Arc::new(reference),
            origin_policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Build the Axum router: `/time` upgrades to the time protocol, anything
/// not routed is served from `static_dir`.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/time", get(time_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Load TLS credentials, bind the listener and start serving.
///
/// Both failures are fatal: nothing is served without valid credentials.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, ServerError> {
    let tls = RustlsConfig::from_pem_file(&config.tls.cert, &config.tls.key)
        .await
        .map_err(|source| ServerError::Tls {
            cert: config.tls.cert.clone(),
            key: config.tls.key.clone(),
            source,
        })?;

    let mut state = AppState::new(
        TimeReference::new(config.ntp_host.clone()),
        policy_for(&config.allowed_origins),
    );
    if config.metrics_enabled {
        state = state.with_metrics(m::install_recorder()?);
    }
    let router = build_router(state, &config.static_dir);

    let handle = axum_server::Handle::new();
    let server = axum_server::bind_rustls(config.listen_addr, tls).handle(handle.clone());
    let task = tokio::spawn(async move {
        server
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .await
    });

    let Some(local_addr) = handle.listening().await else {
        let source = match task.await {
            Ok(Err(e)) => e,
            Ok(Ok(())) => std::io::Error::other("server exited before listening"),
            Err(e) => std::io::Error::other(e),
        };
        return Err(ServerError::Bind {
            addr: config.listen_addr,
            source,
        });
    };

    tracing::info!(
        addr = %local_addr,
        ntp_host = %config.ntp_host,
        static_dir = %config.static_dir.display(),
        "time server started, connect to wss://<host>:{}/time",
        local_addr.port()
    );

    Ok(ServerHandle {
        local_addr,
        handle,
        task,
    })
}

/// Serve the router over plain TCP on an already-bound listener.
///
/// For tests and for deployments behind a TLS-terminating proxy.
pub fn serve(listener: tokio::net::TcpListener, router: Router) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    })
}

/// Handle returned by [`start`]. Keeps the server task alive.
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    handle: axum_server::Handle,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Stop accepting connections and give open sessions `grace` to finish.
    pub fn shutdown(&self, grace: Duration) {
        self.handle.graceful_shutdown(Some(grace));
    }

    /// Wait for the server task to exit.
    pub async fn wait(self) -> Result<(), ServerError> {
        match self.task.await {
            Ok(result) => result.map_err(ServerError::from),
            Err(e) => Err(ServerError::Io(std::io::Error::other(e))),
        }
    }
}

/// WebSocket upgrade handler for `/time`.
async fn time_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::error!(peer = %peer, error = %rejection, "websocket upgrade failed");
            metrics::counter!(m::WS_UPGRADE_FAILURES_TOTAL, "reason" => "not_websocket").increment(1);
            return rejection.into_response();
        }
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.origin_policy.allows(origin) {
        tracing::warn!(
            peer = %peer,
            origin = origin.unwrap_or_default(),
            "websocket upgrade refused for origin"
        );
        metrics::counter!(m::WS_UPGRADE_FAILURES_TOTAL, "reason" => "origin").increment(1);
        return StatusCode::FORBIDDEN.into_response();
    }

    let reference = Arc::clone(&state.reference);
    ws.on_failed_upgrade(move |error| {
        tracing::error!(peer = %peer, error = %error, "websocket upgrade failed");
        metrics::counter!(m::WS_UPGRADE_FAILURES_TOTAL, "reason" => "handshake").increment(1);
    })
    .on_upgrade(move |socket| session::serve_socket(socket, peer, reference))
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "ntp_host": state.reference.host(),
    }))
}

/// Prometheus text exposition, when enabled.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
