//! Wraps field sets as points and hands them to the sink.

use crate::fields::{FieldSet, Point};
use crate::logger::LoggerSlot;
use crate::scheduler::FieldsHandler;
use crate::sink::Sink;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

/// Publishes one point per tick to a [`Sink`].
pub struct Publisher<S> {
    sink: S,
    measurement: String,
    logger: LoggerSlot,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<S: Sink> Publisher<S> {
    /// Create a publisher writing to `measurement`.
    pub fn new(sink: S, measurement: impl Into<String>) -> Self {
        Self {
            sink,
            measurement: measurement.into(),
            logger: LoggerSlot::default(),
            last_timestamp: None,
        }
    }

    pub(crate) fn with_logger(mut self, logger: LoggerSlot) -> Self {
        self.logger = logger;
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Stamp, wrap and write one field set. Write errors are logged and
    /// the point is dropped.
    pub async fn publish(&mut self, fields: FieldSet) {
        let timestamp = self.next_timestamp(Utc::now());
        let point = Point::new(self.measurement.clone(), fields, timestamp);

        match self.sink.write(&point).await {
            Ok(()) => {
                debug!(
                    measurement = %self.measurement,
                    fields = point.fields.len(),
                    "Published runtime point"
                );
            }
            Err(e) => {
                warn!(measurement = %self.measurement, error = %e, "Failed to publish runtime point");
                self.logger
                    .get()
                    .print(&format!("failed to write point to '{}': {}", self.measurement, e));
            }
        }
    }

    /// Wall-clock time, nudged forward so consecutive points never share a
    /// timestamp.
    fn next_timestamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

impl<S: Sink> FieldsHandler for Publisher<S> {
    async fn on_fields(&mut self, fields: FieldSet) {
        self.publish(fields).await;
    }
}
