//! WebSocket front end of the time service.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `server` | Router, listener, TLS, per-connection upgrade |
//! | `session` | Per-connection request/reply loop |
//! | `origin` | Upgrade authorization policies |
//! | `config` | Startup configuration |
//! | `metrics` | Prometheus recorder and metric names |

pub mod config;
pub mod errors;
pub mod metrics;
pub mod origin;
pub mod server;
pub mod session;

pub use config::{parse_listen_addr, ServerConfig, TlsPaths};
pub use errors::ServerError;
pub use origin::{AllowAnyOrigin, AllowedOrigins, OriginPolicy};
pub use server::{build_router, serve, start, AppState, ServerHandle};
pub use session::{run_session, SessionEnd};
