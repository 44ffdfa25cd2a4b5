//! Test telemetry: records every signal for later assertions.

use std::sync::Mutex;

use payflow_core::telemetry::{Signal, Telemetry};

/// Telemetry that keeps every recorded signal in order.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingTelemetry {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded signals.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    /// Number of times `signal` was recorded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn count(&self, signal: Signal) -> usize {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == signal)
            .count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, signal: Signal) {
        self.signals.lock().unwrap().push(signal);
    }
}
