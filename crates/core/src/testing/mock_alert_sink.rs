//! Mock alert sink for testing.

use std::sync::{Arc, Mutex};

use crate::notify::{AlertError, AlertSink};

/// A call made on the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCall {
    Start,
    Stop,
}

/// Mock implementation of the AlertSink trait.
///
/// Clones share the call log, so a test can keep one clone while the ring
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockAlertSink {
    calls: Arc<Mutex<Vec<AlertCall>>>,
    fail: bool,
}

impl MockAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<AlertCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: AlertCall) -> Result<(), AlertError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.fail {
            return Err(AlertError::DeviceUnavailable("mock device".to_string()));
        }
        Ok(())
    }
}

impl AlertSink for MockAlertSink {
    fn start_loop(&mut self) -> Result<(), AlertError> {
        self.record(AlertCall::Start)
    }

    fn stop(&mut self) -> Result<(), AlertError> {
        self.record(AlertCall::Stop)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
