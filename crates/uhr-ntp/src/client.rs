use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uhr_core::{unix_millis, LeapStatus};

use crate::error::QueryError;
use crate::sntp::SntpSource;
use crate::source::TimeSource;
use crate::QUERY_TIMEOUT;

/// Where the time in a [`TimeStatus`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeOrigin {
    Reference,
    /// The upstream query failed and the local wall clock was used.
    LocalClock,
}

/// Resolved answer to one time query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeStatus {
    pub time: DateTime<Utc>,
    pub leap: LeapStatus,
    pub origin: TimeOrigin,
}

impl TimeStatus {
    pub fn unix_millis(&self) -> f64 {
        unix_millis(self.time)
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == TimeOrigin::LocalClock
    }
}

/// Client for one upstream time reference host.
///
/// Every call to [`TimeReference::query_time_status`] performs a fresh
/// exchange; nothing is cached between calls or shared between sessions.
#[derive(Clone)]
pub struct TimeReference {
    source: Arc<dyn TimeSource>,
    host: String,
    timeout: Duration,
}

impl TimeReference {
    /// SNTP-backed reference for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_source(Arc::new(SntpSource::new()), host)
    }

    pub fn with_source(source: Arc<dyn TimeSource>, host: impl Into<String>) -> Self {
        Self {
            source,
            host: host.into(),
            timeout: QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the reference for the current time and leap status.
    ///
    /// Never fails: on timeout or error the local clock and
    /// [`LeapStatus::NoWarning`] are returned and the failure is logged.
    pub async fn query_time_status(&self) -> TimeStatus {
        let outcome = tokio::time::timeout(self.timeout, self.source.query(&self.host, self.timeout))
            .await
            .unwrap_or(Err(QueryError::Timeout(self.timeout)));

        match outcome {
            Ok(sample) => TimeStatus {
                time: sample.time,
                leap: self.resolve_leap(sample.leap_indicator),
                origin: TimeOrigin::Reference,
            },
            Err(error) => {
                tracing::error!(
                    host = %self.host,
                    error = %error,
                    kind = error.error_kind(),
                    "failed to query time reference, using local clock and NoWarning"
                );
                TimeStatus {
                    time: Utc::now(),
                    leap: LeapStatus::NoWarning,
                    origin: TimeOrigin::LocalClock,
                }
            }
        }
    }

    /// Validate a raw indicator. Only announcements and loss of sync are
    /// logged; the steady-state NoWarning is silent.
    fn resolve_leap(&self, raw: u8) -> LeapStatus {
        match LeapStatus::try_from(raw) {
            Ok(status) if status.is_announcement() => {
                tracing::info!(host = %self.host, leap = raw, "leap second announcement detected");
                status
            }
            Ok(LeapStatus::NotInSync) => {
                tracing::warn!(host = %self.host, leap = raw, "time reference reports it is not in sync");
                LeapStatus::NotInSync
            }
            Ok(status) => status,
            Err(invalid) => {
                tracing::warn!(host = %self.host, error = %invalid, "unexpected leap indicator, using NoWarning");
                LeapStatus::from_raw_lossy(raw)
            }
        }
    }
}

impl std::fmt::Debug for TimeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeReference")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
