//! Outbound notification queue with duplicate suppression.
//!
//! Producers (the stream classifier and both watchers) call
//! [`NotificationQueue::add`] from their own tasks. A single
//! [`NotificationDispatcher`] drains the queue in FIFO order.

mod dispatcher;

pub use dispatcher::{NotificationDispatcher, NotificationSink, DISPATCH_COOLDOWN, IDLE_WAIT};

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::data::DedupHistory;

/// Routing prefix carried by every queued notification.
pub const NOTIFY_PREFIX: &str = "Notify:";

/// Default number of notifications the queue holds before dropping.
pub const QUEUE_CAPACITY: usize = 256;

/// A notification waiting for delivery, routing prefix included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    text: String,
}

impl PendingNotification {
    /// Wrap a message with the routing prefix.
    pub fn new(message: &str) -> Self {
        Self {
            text: format!("{}{}", NOTIFY_PREFIX, message),
        }
    }

    /// Full text including the routing prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The message without the routing prefix.
    pub fn message(&self) -> &str {
        &self.text[NOTIFY_PREFIX.len()..]
    }
}

/// Producer handle to the outbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    history: Arc<Mutex<DedupHistory>>,
    sender: mpsc::Sender<PendingNotification>,
}

impl NotificationQueue {
    /// Create a queue and the receiver its dispatcher drains.
    pub fn new(window: Duration, capacity: usize) -> (Self, mpsc::Receiver<PendingNotification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = Self {
            history: Arc::new(Mutex::new(DedupHistory::new(window))),
            sender,
        };
        (queue, receiver)
    }

    /// Queue `message` unless an equal one was queued within the window.
    ///
    /// Returns `true` if the message was queued.
    pub fn add(&self, message: &str) -> bool {
        self.add_at(message, Instant::now())
    }

    /// [`add`](Self::add) with an explicit arrival time.
    pub fn add_at(&self, message: &str, now: Instant) -> bool {
        // Hold the history lock across the send so concurrent producers
        // enqueue in the same order they were admitted.
        let mut history = self.history.lock();
        if !history.admit(message, now) {
            debug!("Duplicate notification suppressed: {}", message);
            return false;
        }

        match self.sender.try_send(PendingNotification::new(message)) {
            Ok(()) => {
                info!("Notification queued: {}", message);
                true
            }
            Err(e) => {
                // A dropped message must not suppress its own retry
                history.forget_last();
                match e {
                    mpsc::error::TrySendError::Full(_) => {
                        warn!("Notification queue full, dropping: {}", message)
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        warn!("Notification dispatcher stopped, dropping: {}", message)
                    }
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DEDUP_WINDOW;

    #[test]
    fn test_prefix() {
        let pending = PendingNotification::new("The printer is ready.");
        assert_eq!(pending.text(), "Notify:The printer is ready.");
        assert_eq!(pending.message(), "The printer is ready.");
    }

    #[test]
    fn test_duplicates_within_window_reach_queue_once() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let start = Instant::now();

        assert!(queue.add_at("Cooling the bed", start));
        assert!(!queue.add_at("cooling the bed ", start + Duration::from_secs(1)));
        assert!(!queue.add_at("Cooling the bed", start + Duration::from_secs(29)));

        assert_eq!(rx.try_recv().unwrap().message(), "Cooling the bed");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_spaced_duplicates_each_reach_queue() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let start = Instant::now();

        assert!(queue.add_at("Cooling the bed", start));
        assert!(queue.add_at("Cooling the bed", start + Duration::from_secs(31)));
        assert!(queue.add_at("Cooling the bed", start + Duration::from_secs(62)));

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_fifo_order() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        queue.add("first");
        queue.add("second");
        queue.add("third");

        assert_eq!(rx.try_recv().unwrap().message(), "first");
        assert_eq!(rx.try_recv().unwrap().message(), "second");
        assert_eq!(rx.try_recv().unwrap().message(), "third");
    }

    #[test]
    fn test_full_queue_drops() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, 1);
        assert!(queue.add("first"));
        assert!(!queue.add("second"));
        assert_eq!(rx.try_recv().unwrap().message(), "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_message_can_be_requeued() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, 1);
        let start = Instant::now();

        assert!(queue.add_at("first", start));
        assert!(!queue.add_at("The print has been paused.", start + Duration::from_secs(1)));
        assert_eq!(rx.try_recv().unwrap().message(), "first");

        assert!(queue.add_at("The print has been paused.", start + Duration::from_secs(3)));
        assert_eq!(rx.try_recv().unwrap().message(), "The print has been paused.");
        // The delivered one still suppresses its repeat
        assert!(!queue.add_at("first", start + Duration::from_secs(4)));
    }

    #[test]
    fn test_concurrent_producers() {
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    // Every thread races on the shared message plus one of its own
                    queue.add("The printer is ready.");
                    queue.add(&format!("A new file was added: part{}", i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut messages = Vec::new();
        while let Ok(pending) = rx.try_recv() {
            messages.push(pending.message().to_string());
        }
        assert_eq!(messages.len(), 9);
        assert_eq!(
            messages.iter().filter(|m| *m == "The printer is ready.").count(),
            1
        );
    }
}
