//! Drives the classifier from the status stream and carries out its effects.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use printwatch_adapters::PrinterHost;
use printwatch_types::PrinterEvent;
use tracing::{debug, info, warn};

use crate::events::{Classifier, Effect};
use crate::notify::NotificationQueue;
use crate::source::decode_frame;
use crate::watch::{ReconnectWatcher, TemperatureHandle};

/// What the stream should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Drop the connection and start a new one.
    Reconnect,
}

/// Owner of the classifier and everything its effects touch.
///
/// All printer state mutation happens here, on the status stream task.
/// Watchers only see the `printing` flag mirrored after each event.
pub struct Monitor {
    classifier: Classifier,
    host: Arc<dyn PrinterHost>,
    queue: NotificationQueue,
    temperature: TemperatureHandle,
    reconnect: ReconnectWatcher,
    printing: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(
        host: Arc<dyn PrinterHost>,
        queue: NotificationQueue,
        temperature: TemperatureHandle,
        reconnect: ReconnectWatcher,
        printing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            classifier: Classifier::new(),
            host,
            queue,
            temperature,
            reconnect,
            printing,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Take the initial file snapshot without announcing anything.
    ///
    /// On failure the first later refresh becomes the baseline instead.
    pub async fn prime_files(&mut self) -> bool {
        match self.host.file_list().await {
            Ok(files) => {
                info!("Initial file list has {} entries", files.len());
                self.classifier.apply_file_list(files);
                true
            }
            Err(e) => {
                warn!("Failed to fetch initial file list: {}", e);
                false
            }
        }
    }

    /// Decode and handle one text frame from the status stream.
    ///
    /// Malformed frames are logged and dropped.
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        match decode_frame(text) {
            Ok(Some(event)) => self.handle_event(&event).await,
            Ok(None) => Flow::Continue,
            Err(e) => {
                warn!("Dropping malformed frame ({}): {}", e, text);
                Flow::Continue
            }
        }
    }

    /// Classify one event and carry out the resulting effects.
    pub async fn handle_event(&mut self, event: &PrinterEvent) -> Flow {
        let effects = self.classifier.classify(event);
        let flow = self.apply(effects).await;
        self.printing
            .store(self.classifier.is_printing(), Ordering::SeqCst);
        flow
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> Flow {
        let mut pending = VecDeque::from(effects);
        let mut flow = Flow::Continue;

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Notify(text) => {
                    self.queue.add(&text);
                }
                Effect::ArmTemperatureWatch => self.temperature.arm(),
                Effect::StartReconnectWatch => {
                    // Detached; the session clears its own flag
                    let _ = self.reconnect.try_start();
                }
                Effect::CloseStream => flow = Flow::Reconnect,
                Effect::RefreshFiles => match self.host.file_list().await {
                    Ok(files) => pending.extend(self.classifier.apply_file_list(files)),
                    Err(e) => warn!("Failed to refresh file list: {}", e),
                },
                Effect::ConfirmPrintStart => match self.host.heaters().await {
                    Ok(heaters) => pending.extend(self.classifier.confirm_print_start(&heaters)),
                    Err(e) => debug!("Heater sample unavailable for print start check: {}", e),
                },
            }
        }

        flow
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("classifier", &self.classifier)
            .field("temperature", &self.temperature)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}
