//! Time reference client: one bounded NTP query per call, with a local-clock
//! fallback so callers always get an answer.

pub mod client;
pub mod error;
pub mod mock;
pub mod sntp;
pub mod source;

use std::time::Duration;

pub use client::{TimeOrigin, TimeReference, TimeStatus};
pub use error::QueryError;
pub use sntp::SntpSource;
pub use source::{Sample, TimeSource};

/// NTP host queried when none is configured.
pub const DEFAULT_NTP_HOST: &str = "ntp.time.nl";

/// Upper bound on a single upstream query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);
