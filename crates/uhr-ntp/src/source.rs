use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QueryError;

/// Raw result of one upstream exchange, before leap validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Reference time, already corrected for the local clock offset.
    pub time: DateTime<Utc>,
    /// Two-bit NTP leap indicator as received. May be out of range for
    /// misbehaving sources; the client validates it.
    pub leap_indicator: u8,
}

/// One upstream time exchange. Implementations must not cache.
#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn query(&self, host: &str, timeout: Duration) -> Result<Sample, QueryError>;
}
