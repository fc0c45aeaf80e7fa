use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QueryError;
use crate::source::{Sample, TimeSource};

/// Pre-programmed query outcomes for deterministic tests without network.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Sample(Sample),
    Error(QueryError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
    /// Never complete; only the caller's timeout ends the query.
    Hang,
}

impl MockResponse {
    /// Convenience: a successful sample.
    pub fn at(time: DateTime<Utc>, leap_indicator: u8) -> Self {
        Self::Sample(Sample {
            time,
            leap_indicator,
        })
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock source that returns pre-programmed responses in sequence.
///
/// Once the script is exhausted the last response repeats.
pub struct MockSource {
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
}

impl MockSource {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
        }
    }

    /// A source that always answers with the same sample.
    pub fn fixed(time: DateTime<Utc>, leap_indicator: u8) -> Self {
        Self::new(vec![MockResponse::at(time, leap_indicator)])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TimeSource for MockSource {
    async fn query(&self, _host: &str, _timeout: Duration) -> Result<Sample, QueryError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        let Some(mut response) = self
            .responses
            .get(idx)
            .or_else(|| self.responses.last())
        else {
            return Err(QueryError::Network(format!(
                "MockSource: no response configured for call {idx}"
            )));
        };

        loop {
            match response {
                MockResponse::Sample(sample) => return Ok(*sample),
                MockResponse::Error(error) => return Err(error.clone()),
                MockResponse::Delay(delay, inner) => {
                    tokio::time::sleep(*delay).await;
                    response = &**inner;
                }
                MockResponse::Hang => return std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn responses_in_sequence_then_repeat_last() {
        let source = MockSource::new(vec![
            MockResponse::at(t(1), 0),
            MockResponse::Error(QueryError::Network("down".into())),
        ]);

        let first = source.query("h", Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.time, t(1));
        assert!(source.query("h", Duration::from_secs(1)).await.is_err());
        assert!(source.query("h", Duration::from_secs(1)).await.is_err());
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_script_is_an_error() {
        let source = MockSource::new(vec![]);
        let err = source.query("h", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.error_kind(), "network_error");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response_waits() {
        let source = MockSource::new(vec![MockResponse::delayed(
            Duration::from_secs(2),
            MockResponse::at(t(5), 1),
        )]);

        let started = tokio::time::Instant::now();
        let sample = source.query("h", Duration::from_secs(5)).await.unwrap();
        assert_eq!(sample.leap_indicator, 1);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
