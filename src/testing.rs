//! Test doubles for the printer host and the relay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use printwatch_adapters::{AdapterError, PrinterHost};
use printwatch_types::{HeaterReading, HeaterSnapshot, ServerInfo};

use crate::error::RelayError;
use crate::notify::{NotificationSink, PendingNotification};

/// Scriptable [`PrinterHost`].
#[derive(Debug, Default)]
pub struct FakeHost {
    /// Heater samples returned in order; the last one repeats.
    heaters: Mutex<VecDeque<HeaterSnapshot>>,
    /// `None` makes the file list query fail.
    files: Mutex<Option<Vec<String>>>,
    /// Server info query results in order; the last one repeats.
    states: Mutex<VecDeque<Option<String>>>,
    heater_calls: AtomicUsize,
    info_calls: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[&str]) -> Self {
        let host = Self::default();
        host.set_files(files);
        host
    }

    pub fn set_files(&self, files: &[&str]) {
        *self.files.lock() = Some(files.iter().map(|f| f.to_string()).collect());
    }

    pub fn fail_files(&self) {
        *self.files.lock() = None;
    }

    /// Queue a sample with both heaters reported.
    pub fn push_heaters(&self, bed: (f64, f64), extruder: (f64, f64)) {
        self.heaters.lock().push_back(HeaterSnapshot {
            bed: Some(HeaterReading::new(bed.0, bed.1)),
            extruder: Some(HeaterReading::new(extruder.0, extruder.1)),
        });
    }

    pub fn push_snapshot(&self, snapshot: HeaterSnapshot) {
        self.heaters.lock().push_back(snapshot);
    }

    /// Queue a firmware state; `None` makes that query fail.
    pub fn push_state(&self, state: Option<&str>) {
        self.states.lock().push_back(state.map(str::to_string));
    }

    pub fn heater_calls(&self) -> usize {
        self.heater_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }
}

fn next_or_last<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl PrinterHost for FakeHost {
    async fn heaters(&self) -> Result<HeaterSnapshot, AdapterError> {
        self.heater_calls.fetch_add(1, Ordering::SeqCst);
        let mut heaters = self.heaters.lock();
        next_or_last(&mut *heaters).ok_or(AdapterError::Timeout)
    }

    async fn file_list(&self) -> Result<Vec<String>, AdapterError> {
        self.files
            .lock()
            .clone()
            .ok_or_else(|| AdapterError::Connection("refused".to_string()))
    }

    async fn server_info(&self) -> Result<ServerInfo, AdapterError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock();
        match next_or_last(&mut *states).flatten() {
            Some(klippy_state) => Ok(ServerInfo { klippy_state }),
            None => Err(AdapterError::Timeout),
        }
    }
}

/// [`NotificationSink`] recording what it receives and when.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, Instant)>>,
    attempts: AtomicUsize,
    failing: bool,
}

impl RecordingSink {
    /// A sink refusing every delivery, like a disconnected relay.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<(String, Instant)> {
        self.delivered.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &PendingNotification) -> Result<(), RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(RelayError::NotConnected);
        }
        self.delivered
            .lock()
            .push((notification.text().to_string(), Instant::now()));
        Ok(())
    }
}
