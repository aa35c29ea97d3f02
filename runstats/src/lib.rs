//! Process runtime metrics collector.
//!
//! Samples the running process at a fixed interval (CPU time and threads,
//! heap and resident memory, allocator reclamation) and writes one tagged,
//! timestamped point per tick to a [`Sink`].
//!
//! ```ignore
//! use runstats::{Config, start};
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let handle = start(token.clone(), Config::default(), my_sink).await?;
//! handle.set_logger(runstats::TracingLogger);
//!
//! // ... later
//! token.cancel();
//! handle.join().await?;
//! ```
//!
//! Heap and reclamation fields require [`alloc::INSTRUMENTED`] as the
//! global allocator.

pub mod alloc;
pub mod collector;
pub mod config;
pub mod fields;
pub mod logger;
pub mod publish;
pub mod sampler;
pub mod scheduler;
pub mod sink;

#[cfg(target_os = "linux")]
mod linux;

pub use collector::{Handle, StartError, start};
pub use config::{Config, ConfigError};
pub use fields::{FieldSet, FieldValue, Point};
pub use logger::{DefaultLogger, Logger, TracingLogger};
pub use publish::Publisher;
pub use sampler::{Group, Groups, RuntimeSampler};
pub use scheduler::{FieldsHandler, MAX_INTERVAL, Scheduler, SchedulerError, State};
pub use sink::{Sink, SinkError};
