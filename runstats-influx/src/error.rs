//! Error types for the InfluxDB sink.

use thiserror::Error;

/// Errors constructing an [`InfluxSink`](crate::InfluxSink).
#[derive(Debug, Error)]
pub enum InfluxError {
    #[error("Invalid InfluxDB endpoint '{host}': {reason}")]
    InvalidEndpoint { host: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
