//! Zenoh sink for runstats.
//!
//! Each point is published as JSON on `<key_prefix>/<measurement>`.
//! Zenoh requires a multi-threaded tokio runtime.

pub mod error;
pub mod session;
pub mod sink;

pub use error::ZenohSinkError;
pub use session::{ZenohConfig, connect};
pub use sink::ZenohSink;
