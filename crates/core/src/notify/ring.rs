use tracing::warn;

use super::AlertSink;

/// Owns the `ringing` flag and the audio sink behind it.
pub struct RingController {
    ringing: bool,
    sink: Box<dyn AlertSink>,
}

impl RingController {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            ringing: false,
            sink,
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    /// Ring for a new order. Playback restarts from the beginning.
    ///
    /// Returns true if the flag changed.
    pub fn ring(&mut self) -> bool {
        let changed = !self.ringing;
        self.ringing = true;
        if let Err(e) = self.sink.start_loop() {
            warn!("Ring playback failed on {} sink: {}", self.sink.name(), e);
        }
        changed
    }

    /// Silence the ring and rewind playback. Returns true if it was ringing.
    pub fn stop(&mut self) -> bool {
        if !self.ringing {
            return false;
        }
        self.ringing = false;
        if let Err(e) = self.sink.stop() {
            warn!("Failed to stop ring on {} sink: {}", self.sink.name(), e);
        }
        true
    }
}
