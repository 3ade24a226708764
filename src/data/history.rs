//! Recent-notification history for duplicate suppression.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Default window within which equal notifications are collapsed.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(30);

/// A normalized notification and when it was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub text: String,
    pub at: Instant,
}

/// Time-windowed history of accepted notifications.
///
/// Records are kept in insertion order, so expired entries always form a
/// prefix and pruning is a trim from the front.
#[derive(Debug, Clone)]
pub struct DedupHistory {
    records: VecDeque<NotificationRecord>,
    window: Duration,
}

impl Default for DedupHistory {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

impl DedupHistory {
    /// Create an empty history with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            records: VecDeque::new(),
            window,
        }
    }

    /// Normalize a message for comparison: trimmed and lowercased.
    pub fn normalize(message: &str) -> String {
        message.trim().to_lowercase()
    }

    /// Record `message` at `now` unless an equal one is still in the window.
    ///
    /// Returns `true` if the message was accepted.
    pub fn admit(&mut self, message: &str, now: Instant) -> bool {
        self.prune(now);

        let normalized = Self::normalize(message);
        if self.records.iter().any(|r| r.text == normalized) {
            return false;
        }

        self.records.push_back(NotificationRecord {
            text: normalized,
            at: now,
        });
        true
    }

    /// Withdraw the most recently admitted record.
    pub fn forget_last(&mut self) -> Option<NotificationRecord> {
        self.records.pop_back()
    }

    /// Drop records older than the window.
    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.records.front() {
            if now.saturating_duration_since(front.at) > self.window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
