//! Collector lifecycle: start-up and the handle it returns.

use crate::config::{Config, ConfigError};
use crate::logger::{Logger, LoggerSlot};
use crate::publish::Publisher;
use crate::sampler::{Groups, RuntimeSampler};
use crate::scheduler::{Scheduler, SchedulerError, State};
use crate::sink::{Sink, SinkError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Errors returned synchronously by [`start`].
#[derive(Debug, Error)]
pub enum StartError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink not ready: {0}")]
    Sink(#[from] SinkError),

    #[error("Invalid schedule: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Resolve `config`, check the sink, and start collecting in the background.
///
/// Cancelling `token` is the only way to stop the collector. Must be called
/// from within a tokio runtime.
pub async fn start<S: Sink>(
    token: CancellationToken,
    config: Config,
    sink: S,
) -> Result<Handle, StartError> {
    let config = config.resolve();
    config.validate()?;

    sink.ready().await?;

    let logger = LoggerSlot::default();
    let publisher = Publisher::new(sink, config.measurement.clone()).with_logger(logger.clone());
    let sampler = RuntimeSampler::new(Groups::from_config(&config));
    let scheduler =
        Scheduler::new(config.collection_interval, sampler, publisher)?.with_logger(logger.clone());

    let state = scheduler.subscribe();
    let task = tokio::spawn(scheduler.run(token));

    info!(
        measurement = %config.measurement,
        host = %config.host,
        interval_ms = config.collection_interval.as_millis() as u64,
        "Runtime collector started"
    );

    Ok(Handle {
        config,
        logger,
        state,
        task,
    })
}

/// Handle to a running collector.
pub struct Handle {
    config: Config,
    logger: LoggerSlot,
    state: watch::Receiver<State>,
    task: JoinHandle<()>,
}

impl Handle {
    /// Replace the logger used for write errors and contained panics.
    pub fn set_logger<L: Logger + 'static>(&self, logger: L) {
        self.logger.set(Arc::new(logger));
    }

    /// The resolved configuration the collector runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the background task to exit after cancellation.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("measurement", &self.config.measurement)
            .field("state", &self.state())
            .finish()
    }
}
