//! Heater target watcher.
//!
//! The watcher polls the printer host once per period while armed and no
//! print is running. Each heater that settles on a nonzero target is
//! announced once, after which the watcher disarms itself. A heater that
//! drifts back out of tolerance may be announced again on a later approach.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use printwatch_adapters::PrinterHost;
use printwatch_types::{format_celsius, Heater, HeaterSnapshot, TEMPERATURE_TOLERANCE};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::notify::NotificationQueue;

/// Default polling period.
pub const TEMPERATURE_POLL: Duration = Duration::from_secs(1);

/// Per-heater "target reached" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemperatureTracker {
    bed_reached: bool,
    extruder_reached: bool,
}

impl TemperatureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `heater` is currently marked as having reached its target.
    pub fn is_reached(&self, heater: Heater) -> bool {
        match heater {
            Heater::Bed => self.bed_reached,
            Heater::Extruder => self.extruder_reached,
        }
    }

    fn flag(&mut self, heater: Heater) -> &mut bool {
        match heater {
            Heater::Bed => &mut self.bed_reached,
            Heater::Extruder => &mut self.extruder_reached,
        }
    }

    /// Update the flags from one sample.
    ///
    /// Returns each heater that newly reached its target, with that target.
    /// Heaters missing from the sample or targeting zero are left alone.
    pub fn observe(&mut self, snapshot: &HeaterSnapshot) -> Vec<(Heater, f64)> {
        let mut reached = Vec::new();

        for heater in Heater::ALL {
            let Some(reading) = snapshot.get(heater) else {
                continue;
            };
            if reading.target == 0.0 {
                continue;
            }

            let flag = self.flag(heater);
            if reading.within(TEMPERATURE_TOLERANCE) {
                if !*flag {
                    *flag = true;
                    reached.push((heater, reading.target));
                }
            } else {
                *flag = false;
            }
        }

        reached
    }
}

/// Arms and disarms a running [`TemperatureWatcher`].
#[derive(Debug, Clone, Default)]
pub struct TemperatureHandle {
    armed: Arc<AtomicBool>,
}

impl TemperatureHandle {
    pub fn arm(&self) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            debug!("Temperature watch armed");
        }
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Polling loop announcing heaters that reach their target.
pub struct TemperatureWatcher {
    host: Arc<dyn PrinterHost>,
    queue: NotificationQueue,
    handle: TemperatureHandle,
    printing: Arc<AtomicBool>,
    tracker: TemperatureTracker,
    period: Duration,
}

impl TemperatureWatcher {
    /// Create a disarmed watcher.
    ///
    /// `printing` is the shared "print confirmed in progress" flag; no
    /// polling happens while it is set.
    pub fn new(
        host: Arc<dyn PrinterHost>,
        queue: NotificationQueue,
        printing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            host,
            queue,
            handle: TemperatureHandle::default(),
            printing,
            tracker: TemperatureTracker::new(),
            period: TEMPERATURE_POLL,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Handle for arming this watcher from elsewhere.
    pub fn handle(&self) -> TemperatureHandle {
        self.handle.clone()
    }

    pub fn tracker(&self) -> &TemperatureTracker {
        &self.tracker
    }

    /// Run one polling pass and return the notifications it produced.
    pub async fn tick(&mut self) -> Vec<String> {
        if !self.handle.is_armed() || self.printing.load(Ordering::SeqCst) {
            return Vec::new();
        }

        let snapshot = match self.host.heaters().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to sample heaters: {}", e);
                return Vec::new();
            }
        };

        let reached = self.tracker.observe(&snapshot);
        if reached.is_empty() {
            return Vec::new();
        }

        self.handle.disarm();
        info!("Heater target reached, temperature watch disarmed");

        reached
            .into_iter()
            .map(|(heater, target)| {
                let message = format!(
                    "The {} has reached its target temperature of {}°C",
                    heater,
                    format_celsius(target)
                );
                self.queue.add(&message);
                message
            })
            .collect()
    }

    /// Run the watcher on a background task for the life of the process.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                self.tick().await;
            }
        })
    }
}

impl std::fmt::Debug for TemperatureWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemperatureWatcher")
            .field("armed", &self.handle.is_armed())
            .field("tracker", &self.tracker)
            .field("period", &self.period)
            .finish()
    }
}
