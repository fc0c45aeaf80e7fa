use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsntp::{AsyncSntpClient, Config, LeapIndicator, ProtocolError, SynchronizationError};

use crate::error::QueryError;
use crate::source::{Sample, TimeSource};

/// Wire value reported when the reference declares itself unsynchronized.
const ALARM_BITS: u8 = 3;

/// [`TimeSource`] backed by an SNTP exchange over UDP.
///
/// A fresh client (and socket) is created per query so nothing is held
/// between calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct SntpSource;

impl SntpSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeSource for SntpSource {
    async fn query(&self, host: &str, timeout: Duration) -> Result<Sample, QueryError> {
        let client = AsyncSntpClient::with_config(Config::default().timeout(timeout));
        let result = match client.synchronize(host).await {
            Ok(result) => result,
            // rsntp refuses alarm replies (and stratum 16) without exposing
            // their timestamps, so the local clock stands in for the time.
            Err(SynchronizationError::ProtocolError(ProtocolError::ServerNotSynchronized)) => {
                return Ok(Sample {
                    time: Utc::now(),
                    leap_indicator: ALARM_BITS,
                });
            }
            Err(e) => return Err(QueryError::Network(e.to_string())),
        };

        let since_epoch = result
            .datetime()
            .unix_timestamp()
            .map_err(|e| QueryError::InvalidReply(e.to_string()))?;
        let secs = i64::try_from(since_epoch.as_secs())
            .map_err(|_| QueryError::InvalidReply("timestamp out of range".into()))?;
        let time = DateTime::<Utc>::from_timestamp(secs, since_epoch.subsec_nanos())
            .ok_or_else(|| QueryError::InvalidReply("timestamp out of range".into()))?;

        Ok(Sample {
            time,
            leap_indicator: leap_bits(result.leap_indicator()),
        })
    }
}

/// Two-bit wire value of the indicator.
fn leap_bits(indicator: LeapIndicator) -> u8 {
    match indicator {
        LeapIndicator::NoWarning => 0,
        LeapIndicator::LastMinuteHas61Seconds => 1,
        LeapIndicator::LastMinuteHas59Seconds => 2,
        LeapIndicator::AlarmCondition => ALARM_BITS,
    }
}
