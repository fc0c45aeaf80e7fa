use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// One event recorded by [`LogCapture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// In-memory tracing layer that records every event it sees.
///
/// Clones share the same buffer, so a test can keep one handle and install
/// the other on a scoped subscriber:
///
/// ```no_run
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let capture = uhr_telemetry::LogCapture::new();
/// let subscriber = tracing_subscriber::registry().with(capture.clone());
/// let _guard = tracing::subscriber::set_default(subscriber);
/// tracing::info!(leap = 1, "leap second announcement detected");
/// assert_eq!(capture.with_message("leap second").len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Events whose message contains `needle`.
    pub fn with_message(&self, needle: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        });
    }
}

/// Visitor that extracts fields from a tracing event.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let val = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(val),
            name => {
                self.fields.insert(name.to_string(), val);
            }
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            name => {
                self.fields.insert(name.to_string(), value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn records_level_message_and_fields() {
        let capture = LogCapture::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(host = "ntp.example", leap = 3, "reference not in sync");
            tracing::info!("plain");
        });

        let events = capture.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].message, "reference not in sync");
        assert_eq!(events[0].fields["host"], "ntp.example");
        assert_eq!(events[0].fields["leap"], "3");
        assert_eq!(capture.at_level(Level::INFO).len(), 1);
        assert_eq!(capture.with_message("sync").len(), 1);

        capture.clear();
        assert!(capture.events().is_empty());
    }
}
