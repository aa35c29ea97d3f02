//! Pluggable logger for collector diagnostics.

use parking_lot::RwLock;
use std::io::Write;
use std::sync::Arc;

/// Receives collector diagnostics.
///
/// `print` carries transient problems such as failed writes. `fatal` is
/// reserved for faults the collector survived but the operator should see,
/// such as a panicking sink. Neither call stops the collector.
pub trait Logger: Send + Sync {
    fn print(&self, msg: &str);
    fn fatal(&self, msg: &str);
}

/// Discards informational messages and writes fatal ones to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn print(&self, _msg: &str) {}

    fn fatal(&self, msg: &str) {
        let _ = writeln!(std::io::stderr().lock(), "runstats: {}", msg);
    }
}

/// Routes both channels to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn print(&self, msg: &str) {
        tracing::info!(target: "runstats", "{}", msg);
    }

    fn fatal(&self, msg: &str) {
        tracing::error!(target: "runstats", "{}", msg);
    }
}

/// Swappable logger shared between the handle and the tick loop.
#[derive(Clone)]
pub(crate) struct LoggerSlot {
    inner: Arc<RwLock<Arc<dyn Logger>>>,
}

impl LoggerSlot {
    pub(crate) fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(logger)),
        }
    }

    /// Current logger. The lock is released before the caller logs.
    pub(crate) fn get(&self) -> Arc<dyn Logger> {
        self.inner.read().clone()
    }

    pub(crate) fn set(&self, logger: Arc<dyn Logger>) {
        *self.inner.write() = logger;
    }
}

impl Default for LoggerSlot {
    fn default() -> Self {
        Self::new(Arc::new(DefaultLogger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for Recording {
        fn print(&self, msg: &str) {
            self.lines.lock().push(format!("print: {}", msg));
        }

        fn fatal(&self, msg: &str) {
            self.lines.lock().push(format!("fatal: {}", msg));
        }
    }

    #[test]
    fn test_slot_swaps_logger() {
        let slot = LoggerSlot::default();
        slot.get().print("dropped by the default logger");

        let recording = Arc::new(Recording::default());
        slot.set(recording.clone());

        let clone = slot.clone();
        clone.get().print("write failed");
        clone.get().fatal("sink panicked");

        assert_eq!(
            *recording.lines.lock(),
            vec!["print: write failed", "fatal: sink panicked"]
        );
    }
}
