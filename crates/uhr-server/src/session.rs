use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use uhr_core::{ClientRequest, ServerReply};
use uhr_ntp::TimeReference;

use crate::metrics as m;

/// Longest payload excerpt included in a malformed-request warning.
const LOGGED_PAYLOAD_LIMIT: usize = 256;

/// Why a session loop stopped. Every variant is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame with a normal or going-away code, or the stream ended.
    PeerClosed,
    /// Close frame with any other code.
    AbnormalClose(u16),
    ReadFailed(String),
    EncodeFailed(String),
    WriteFailed(String),
}

impl SessionEnd {
    /// Short classification string for logging/metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::AbnormalClose(_) => "abnormal_close",
            Self::ReadFailed(_) => "read_failed",
            Self::EncodeFailed(_) => "encode_failed",
            Self::WriteFailed(_) => "write_failed",
        }
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("closed by peer"),
            Self::AbnormalClose(code) => write!(f, "closed by peer with code {code}"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::EncodeFailed(e) => write!(f, "encode failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// Frame type of a request; the reply reuses it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Text,
    Binary,
}

impl FrameKind {
    fn wrap(self, payload: String) -> Message {
        match self {
            Self::Text => Message::Text(payload.into()),
            Self::Binary => Message::Binary(payload.into_bytes().into()),
        }
    }
}

/// Own an upgraded socket until the session ends, then release it.
pub async fn serve_socket(socket: WebSocket, peer: SocketAddr, reference: Arc<TimeReference>) {
    tracing::info!(peer = %peer, "websocket client connected");
    metrics::counter!(m::WS_CONNECTIONS_TOTAL).increment(1);
    metrics::gauge!(m::WS_CONNECTIONS_ACTIVE).increment(1.0);

    let (mut outbound, inbound) = socket.split();
    let end = run_session(inbound, &mut outbound, &reference, peer).await;
    // Best effort: the peer may already be gone.
    let _ = outbound.close().await;

    metrics::gauge!(m::WS_CONNECTIONS_ACTIVE).decrement(1.0);
    metrics::counter!(m::WS_DISCONNECTIONS_TOTAL, "reason" => end.reason()).increment(1);
    tracing::info!(peer = %peer, reason = %end, "websocket client disconnected");
}

/// Request/reply loop for one connection.
///
/// Each valid request triggers a fresh time query and exactly one reply,
/// written in request order with the request's frame type. Malformed
/// requests are dropped without a reply. Returns when the connection can no
/// longer be used.
pub async fn run_session<R, W, E>(
    mut inbound: R,
    mut outbound: W,
    reference: &TimeReference,
    peer: SocketAddr,
) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    loop {
        let message = match inbound.next().await {
            Some(Ok(message)) => message,
            Some(Err(error)) => {
                tracing::error!(peer = %peer, error = %error, "websocket read error");
                return SessionEnd::ReadFailed(error.to_string());
            }
            None => return SessionEnd::PeerClosed,
        };

        let (payload, kind) = match &message {
            Message::Text(text) => (text.as_str().as_bytes(), FrameKind::Text),
            Message::Binary(data) => (data.as_ref(), FrameKind::Binary),
            Message::Close(frame) => return close_received(peer, frame.as_ref()),
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        let request = match ClientRequest::decode(payload) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(
                    peer = %peer,
                    error = %error,
                    kind = error.error_kind(),
                    payload = %excerpt(payload),
                    "discarding malformed request"
                );
                metrics::counter!(m::MALFORMED_REQUESTS_TOTAL).increment(1);
                continue;
            }
        };

        let started = Instant::now();
        let status = reference.query_time_status().await;
        metrics::histogram!(m::TIME_QUERY_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        let origin = if status.is_fallback() { "local_clock" } else { "reference" };
        metrics::counter!(m::TIME_QUERIES_TOTAL, "origin" => origin).increment(1);

        let reply = ServerReply::new(&request, status.unix_millis(), status.leap);
        let encoded = match reply.encode() {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::error!(peer = %peer, error = %error, "failed to encode reply");
                return SessionEnd::EncodeFailed(error.to_string());
            }
        };

        if let Err(error) = outbound.send(kind.wrap(encoded)).await {
            tracing::error!(peer = %peer, error = %error, "websocket write error");
            return SessionEnd::WriteFailed(error.to_string());
        }
        metrics::counter!(m::REPLIES_TOTAL, "leap" => status.leap.as_str()).increment(1);
    }
}

/// Normal closure and going-away end the session quietly.
fn close_received(peer: SocketAddr, frame: Option<&CloseFrame>) -> SessionEnd {
    match frame {
        None => SessionEnd::PeerClosed,
        Some(frame) if frame.code == close_code::NORMAL || frame.code == close_code::AWAY => {
            SessionEnd::PeerClosed
        }
        Some(frame) => {
            tracing::error!(
                peer = %peer,
                code = frame.code,
                reason = frame.reason.as_str(),
                "websocket closed abnormally"
            );
            SessionEnd::AbnormalClose(frame.code)
        }
    }
}

fn excerpt(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    match text.char_indices().nth(LOGGED_PAYLOAD_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
