//! Firmware reconnection follow-up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use printwatch_adapters::PrinterHost;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::notify::NotificationQueue;

/// How long a session waits for the firmware before giving up.
pub const RECONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between health checks.
pub const RECONNECTION_POLL: Duration = Duration::from_secs(2);

/// How a reconnection session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    Restored,
    TimedOut,
}

impl ReconnectOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ReconnectOutcome::Restored => {
                "The printer firmware restarted and the connection was re-established."
            }
            ReconnectOutcome::TimedOut => {
                "The printer firmware restarted but the connection could not be re-established."
            }
        }
    }
}

/// Clears the active flag however the session task ends.
struct ActiveSession(Arc<AtomicBool>);

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Watches the printer host come back after a firmware disconnect.
///
/// At most one session runs at a time; [`try_start`](Self::try_start)
/// refuses while one is active.
#[derive(Clone)]
pub struct ReconnectWatcher {
    host: Arc<dyn PrinterHost>,
    queue: NotificationQueue,
    active: Arc<AtomicBool>,
    timeout: Duration,
    poll: Duration,
}

impl ReconnectWatcher {
    pub fn new(host: Arc<dyn PrinterHost>, queue: NotificationQueue) -> Self {
        Self {
            host,
            queue,
            active: Arc::new(AtomicBool::new(false)),
            timeout: RECONNECTION_TIMEOUT,
            poll: RECONNECTION_POLL,
        }
    }

    /// Override the session deadline and polling period.
    pub fn with_timing(mut self, timeout: Duration, poll: Duration) -> Self {
        self.timeout = timeout;
        self.poll = poll;
        self
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a session unless one is already running.
    pub fn try_start(&self) -> Option<JoinHandle<ReconnectOutcome>> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Reconnection session already active");
            return None;
        }

        info!("Reconnection session started");
        let session = ActiveSession(self.active.clone());
        let watcher = self.clone();
        Some(tokio::spawn(async move {
            let _session = session;
            watcher.run().await
        }))
    }

    async fn run(&self) -> ReconnectOutcome {
        let outcome = match tokio::time::timeout(self.timeout, self.wait_until_ready()).await {
            Ok(()) => ReconnectOutcome::Restored,
            Err(_) => ReconnectOutcome::TimedOut,
        };

        match outcome {
            ReconnectOutcome::Restored => info!("Printer firmware is back"),
            ReconnectOutcome::TimedOut => warn!(
                "Printer firmware did not come back within {}s",
                self.timeout.as_secs()
            ),
        }
        self.queue.add(outcome.message());
        outcome
    }

    async fn wait_until_ready(&self) {
        loop {
            match self.host.server_info().await {
                Ok(info) if info.is_ready() => return,
                Ok(info) => debug!("Firmware state while reconnecting: {}", info.klippy_state),
                Err(e) => debug!("Health check failed while reconnecting: {}", e),
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

impl std::fmt::Debug for ReconnectWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectWatcher")
            .field("active", &self.is_active())
            .field("timeout", &self.timeout)
            .field("poll", &self.poll)
            .finish()
    }
}
