//! Ring, popup queue and unread counter for incoming orders.

mod alert;
mod popup;
mod ring;

pub use alert::{AlertError, AlertSink, LogAlertSink};
#[cfg(feature = "audio")]
pub use alert::RodioAlertSink;
pub use popup::PopupQueue;
pub use ring::RingController;

use serde::Serialize;

/// What changed after a notification update.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoticeChange {
    pub ring: bool,
    pub popup: bool,
}

impl NoticeChange {
    pub fn any(&self) -> bool {
        self.ring || self.popup
    }
}

/// Public view of the notification state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeState {
    pub ringing: bool,
    pub popup_current: Option<String>,
    pub popup_queued: usize,
    pub unread: u64,
}

/// Both notification designs side by side: the ring flag over the pending
/// list, and a popup showing one pending order at a time. The bell's unread
/// counter rides along.
pub struct NotificationCenter {
    ring: RingController,
    popup: PopupQueue,
    unread: u64,
}

impl NotificationCenter {
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            ring: RingController::new(sink),
            popup: PopupQueue::new(),
            unread: 0,
        }
    }

    pub fn state(&self) -> NoticeState {
        NoticeState {
            ringing: self.ring.is_ringing(),
            popup_current: self.popup.current().map(String::from),
            popup_queued: self.popup.queued(),
            unread: self.unread,
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.ring.is_ringing()
    }

    /// Order shown in the popup.
    pub fn popup_current(&self) -> Option<&str> {
        self.popup.current()
    }

    /// A new order reached `pending`: ring once, queue it, count it unread.
    pub fn on_incoming(&mut self, order_id: &str) -> NoticeChange {
        self.unread += 1;
        let popup = self.popup.enqueue(order_id.to_string());
        self.ring.ring();
        NoticeChange { ring: true, popup }
    }

    /// Orders found in `pending` without arriving as new: restored, hydrated
    /// or moved back by the server. They ring and queue but stay out of the
    /// unread count.
    pub fn on_pending_restored<'a>(
        &mut self,
        order_ids: impl IntoIterator<Item = &'a str>,
    ) -> NoticeChange {
        let mut queued_any = false;
        for id in order_ids {
            self.popup.enqueue(id.to_string());
            queued_any = true;
        }
        if !queued_any {
            return NoticeChange::default();
        }
        self.ring.ring();
        NoticeChange {
            ring: true,
            popup: true,
        }
    }

    /// An order left `pending`. The ring clears once nothing is pending.
    pub fn on_left_pending(&mut self, order_id: &str, pending_empty: bool) -> NoticeChange {
        let popup = self.popup.remove(order_id);
        let ring = pending_empty && self.ring.stop();
        NoticeChange { ring, popup }
    }

    /// Silence the ring without touching any order.
    pub fn stop_ring(&mut self) -> bool {
        self.ring.stop()
    }

    /// Reset the unread counter. Returns true if it was non-zero.
    pub fn mark_seen(&mut self) -> bool {
        std::mem::take(&mut self.unread) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAlertSink;

    #[test]
    fn test_incoming_rings_and_counts() {
        let mut center = NotificationCenter::new(Box::new(MockAlertSink::new()));

        let change = center.on_incoming("o1");
        assert!(change.ring && change.popup);
        let change = center.on_incoming("o2");
        assert!(change.ring && !change.popup);

        let state = center.state();
        assert!(state.ringing);
        assert_eq!(state.popup_current.as_deref(), Some("o1"));
        assert_eq!(state.popup_queued, 1);
        assert_eq!(state.unread, 2);
    }

    #[test]
    fn test_ring_clears_when_pending_empties() {
        let mut center = NotificationCenter::new(Box::new(MockAlertSink::new()));
        center.on_incoming("o1");
        center.on_incoming("o2");

        let change = center.on_left_pending("o1", false);
        assert!(change.popup);
        assert!(!change.ring);
        assert!(center.is_ringing());
        assert_eq!(center.popup_current(), Some("o2"));

        let change = center.on_left_pending("o2", true);
        assert!(change.ring);
        assert!(!center.is_ringing());
        assert_eq!(center.popup_current(), None);
    }

    #[test]
    fn test_stop_ring_keeps_popup() {
        let mut center = NotificationCenter::new(Box::new(MockAlertSink::new()));
        center.on_incoming("o1");

        assert!(center.stop_ring());
        assert!(!center.stop_ring());
        assert_eq!(center.popup_current(), Some("o1"));
    }

    #[test]
    fn test_restored_pending_rings_without_unread() {
        let sink = MockAlertSink::new();
        let mut center = NotificationCenter::new(Box::new(sink.clone()));

        let change = center.on_pending_restored(["r1", "r2"]);
        assert!(change.ring && change.popup);

        let state = center.state();
        assert!(state.ringing);
        assert_eq!(state.popup_current.as_deref(), Some("r1"));
        assert_eq!(state.popup_queued, 1);
        assert_eq!(state.unread, 0);
        assert_eq!(sink.calls().len(), 1);

        let change = center.on_pending_restored(std::iter::empty());
        assert!(!change.any());
    }

    #[test]
    fn test_mark_seen() {
        let mut center = NotificationCenter::new(Box::new(MockAlertSink::new()));
        assert!(!center.mark_seen());
        center.on_incoming("o1");
        assert!(center.mark_seen());
        assert_eq!(center.state().unread, 0);
    }
}
