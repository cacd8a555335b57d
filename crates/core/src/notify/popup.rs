use std::collections::VecDeque;

/// FIFO of incoming order ids shown one at a time.
#[derive(Debug, Default, Clone)]
pub struct PopupQueue {
    current: Option<String>,
    queued: VecDeque<String>,
}

impl PopupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order currently displayed.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Orders waiting behind the displayed one.
    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Add an order. Returns true if it is displayed right away.
    pub fn enqueue(&mut self, id: String) -> bool {
        if self.current.as_deref() == Some(id.as_str()) || self.queued.contains(&id) {
            return false;
        }
        if self.current.is_none() {
            self.current = Some(id);
            true
        } else {
            self.queued.push_back(id);
            false
        }
    }

    /// Take the displayed order and show the next one.
    pub fn take_current(&mut self) -> Option<String> {
        let taken = self.current.take();
        self.current = self.queued.pop_front();
        taken
    }

    /// Forget an order wherever it is. Returns true if the display changed.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.current.as_deref() == Some(id) {
            self.take_current();
            return true;
        }
        self.queued.retain(|q| q != id);
        false
    }
}
