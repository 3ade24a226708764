//! Paced delivery of queued notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PendingNotification;
use crate::error::RelayError;

/// Pause after each delivered item.
pub const DISPATCH_COOLDOWN: Duration = Duration::from_secs(2);

/// Longest wait on an empty queue before re-checking.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Destination for drained notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn deliver(&self, notification: &PendingNotification) -> Result<(), RelayError>;
}

/// Sole consumer of the notification queue.
///
/// Items are handed to the sink one at a time, in queue order, with a fixed
/// cooldown after each so bursts reach the consumer at a steady pace.
pub struct NotificationDispatcher {
    receiver: mpsc::Receiver<PendingNotification>,
    sink: Arc<dyn NotificationSink>,
    cooldown: Duration,
    idle_wait: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        receiver: mpsc::Receiver<PendingNotification>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            receiver,
            sink,
            cooldown: DISPATCH_COOLDOWN,
            idle_wait: IDLE_WAIT,
        }
    }

    /// Override the pause after each item.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Run the dispatcher on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drain the queue until every producer handle is dropped.
    pub async fn run(mut self) {
        loop {
            match tokio::time::timeout(self.idle_wait, self.receiver.recv()).await {
                Ok(Some(notification)) => {
                    match self.sink.deliver(&notification).await {
                        Ok(()) => info!("Notification delivered: {}", notification.text()),
                        Err(e) => warn!(
                            "Notification not delivered ({}): {}",
                            e,
                            notification.text()
                        ),
                    }
                    tokio::time::sleep(self.cooldown).await;
                }
                Ok(None) => {
                    info!("Notification queue closed, dispatcher stopping");
                    break;
                }
                // Idle: nothing queued within the wait
                Err(_) => continue,
            }
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("cooldown", &self.cooldown)
            .field("idle_wait", &self.idle_wait)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DEDUP_WINDOW;
    use crate::notify::{NotificationQueue, QUEUE_CAPACITY};
    use crate::testing::RecordingSink;

    #[tokio::test(start_paused = true)]
    async fn test_delivers_in_order_with_cooldown() {
        let (queue, rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let sink = Arc::new(RecordingSink::default());
        let handle = NotificationDispatcher::new(rx, sink.clone()).spawn();

        queue.add("A new file was added: a");
        queue.add("A new file was added: b");
        queue.add("A new file was added: c");

        tokio::time::sleep(Duration::from_secs(10)).await;

        let delivered = sink.delivered();
        let texts: Vec<&str> = delivered.iter().map(|(text, _)| text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Notify:A new file was added: a",
                "Notify:A new file was added: b",
                "Notify:A new file was added: c",
            ]
        );
        for pair in delivered.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DISPATCH_COOLDOWN);
        }

        drop(queue);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_consumes_item() {
        let (queue, rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let sink = Arc::new(RecordingSink::failing());
        let handle = NotificationDispatcher::new(rx, sink.clone()).spawn();

        queue.add("The printer is ready.");
        queue.add("Cooling the bed");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.attempts(), 2);
        assert!(sink.delivered().is_empty());

        drop(queue);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_dispatcher_picks_up_late_items() {
        let (queue, rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let sink = Arc::new(RecordingSink::default());
        let _handle = NotificationDispatcher::new(rx, sink.clone()).spawn();

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(sink.delivered().is_empty());

        queue.add("The print has been paused.");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.delivered().len(), 1);
    }
}
