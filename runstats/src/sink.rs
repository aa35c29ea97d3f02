//! Sink abstraction.
//!
//! The collector depends only on [`Sink`]; concrete backends live in
//! adapter crates. Buffering, batching and retry are the sink's business.

use crate::fields::Point;
use std::future::Future;
use thiserror::Error;

/// Errors a sink reports back to the collector.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backend cannot be reached.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The backend answered but refused the point.
    #[error("Sink rejected point (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The point could not be encoded for the backend.
    #[error("Failed to encode point: {0}")]
    Encode(String),

    /// Transport-level failure.
    #[error("Sink transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SinkError {
    /// Wrap a transport error.
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(err))
    }
}

/// Destination for collected points.
pub trait Sink: Send + Sync + 'static {
    /// Check that the backend is reachable. Called once before the first tick.
    fn ready(&self) -> impl Future<Output = Result<(), SinkError>> + Send {
        async { Ok(()) }
    }

    /// Submit one point.
    fn write(&self, point: &Point) -> impl Future<Output = Result<(), SinkError>> + Send;
}

impl<S: Sink> Sink for std::sync::Arc<S> {
    fn ready(&self) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).ready()
    }

    fn write(&self, point: &Point) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).write(point)
    }
}
