//! Tick loop.

use crate::fields::FieldSet;
use crate::logger::LoggerSlot;
use crate::sampler::RuntimeSampler;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Longest accepted tick interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Errors constructing a [`Scheduler`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Tick interval must be > 0")]
    ZeroInterval,

    #[error("Tick interval {0:?} exceeds one year")]
    IntervalTooLong(Duration),
}

/// Collector lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Configured, not ticking yet.
    Created,
    /// Ticking.
    Running,
    /// Cancelled. Terminal.
    Stopped,
}

/// Receives the field set produced by each tick.
pub trait FieldsHandler: Send + 'static {
    fn on_fields(&mut self, fields: FieldSet) -> impl Future<Output = ()> + Send;
}

/// Periodic sampling loop.
///
/// A `Scheduler` starts in [`State::Created`]. [`Scheduler::run`] consumes
/// it, so a stopped scheduler can never tick again; build a new one instead.
pub struct Scheduler<H> {
    interval: Duration,
    sampler: RuntimeSampler,
    handler: H,
    logger: LoggerSlot,
    state: watch::Sender<State>,
}

impl<H: FieldsHandler> Scheduler<H> {
    /// Create a scheduler ticking every `interval`, which must be in
    /// `(0, MAX_INTERVAL]`.
    pub fn new(
        interval: Duration,
        sampler: RuntimeSampler,
        handler: H,
    ) -> Result<Self, SchedulerError> {
        check_interval(interval)?;
        let (state, _) = watch::channel(State::Created);

        Ok(Self {
            interval,
            sampler,
            handler,
            logger: LoggerSlot::default(),
            state,
        })
    }

    pub(crate) fn with_logger(mut self, logger: LoggerSlot) -> Self {
        self.logger = logger;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Run until `token` is cancelled.
    ///
    /// The first tick fires one interval after the call. A tick that overruns
    /// the interval delays the next one instead of causing a burst. Cancelling
    /// while a tick is in flight abandons that tick.
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state.send_replace(State::Running);
        info!(
            interval_ms = self.interval.as_millis() as u64,
            groups = ?self.sampler.groups(),
            "Starting runtime collector"
        );

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            ticks += 1;
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(tick = ticks, "Collector cancelled mid-tick");
                    break;
                }
                _ = self.tick() => {}
            }
        }

        self.state.send_replace(State::Stopped);
        info!(ticks, "Runtime collector stopped");
    }

    /// Sample and hand off once. Panics are contained to the tick.
    async fn tick(&mut self) {
        let sampler = &mut self.sampler;
        let handler = &mut self.handler;

        let result = AssertUnwindSafe(async move {
            let fields = sampler.sample();
            handler.on_fields(fields).await;
        })
        .catch_unwind()
        .await;

        if let Err(panic) = result {
            let reason = panic_message(panic.as_ref());
            tracing::error!(reason = %reason, "Collector tick panicked");
            self.logger
                .get()
                .fatal(&format!("collector tick panicked: {}", reason));
        }
    }
}

fn check_interval(interval: Duration) -> Result<(), SchedulerError> {
    if interval.is_zero() {
        return Err(SchedulerError::ZeroInterval);
    }
    if interval > MAX_INTERVAL {
        return Err(SchedulerError::IntervalTooLong(interval));
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
