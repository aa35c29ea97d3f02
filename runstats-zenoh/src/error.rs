//! Error types for the Zenoh sink.

use thiserror::Error;

/// Errors opening a Zenoh session for the sink.
#[derive(Debug, Error)]
pub enum ZenohSinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Zenoh error: {0}")]
    Session(#[from] zenoh::Error),
}
