//! Classification of printer events into notifications and side effects.
//!
//! [`Classifier`] owns the [`PrinterState`] and [`FileSet`] and is their only
//! writer. It performs no I/O: every decision comes back as a list of
//! [`Effect`]s for the caller to carry out. Two effects ask the caller for
//! more data ([`Effect::RefreshFiles`], [`Effect::ConfirmPrintStart`]); the
//! answers are fed back through [`Classifier::apply_file_list`] and
//! [`Classifier::confirm_print_start`].
//!
//! Only the first subscription snapshot is stored silently. Snapshots taken
//! after a reconnect are classified like any other update, so a change that
//! happened while the stream was down is still announced.

use printwatch_types::{
    format_celsius, ControllerFault, ControllerStatus, Heater, HeaterSnapshot, HeaterStatus,
    PrintState, PrintStats, PrinterEvent, StatusUpdate, ToolheadStatus,
};
use tracing::{debug, info};

use crate::data::{strip_extension, FileSet, PrinterState};

/// Text marking a macro announcement in G-code console output.
pub const MACRO_MARKER: &str = "Executing macro:";

/// Klipper states announced as a lost connection.
const KLIPPER_FAILURE_STATES: &[&str] = &["shutdown", "error"];

/// MCU states announced as a lost connection.
const MCU_FAILURE_STATES: &[&str] = &["shutdown", "error", "offline"];

/// Something the classifier wants done.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Queue a notification.
    Notify(String),
    /// Arm the temperature watcher.
    ArmTemperatureWatch,
    /// Start a reconnection session unless one is active.
    StartReconnectWatch,
    /// Drop the status stream so it reconnects.
    CloseStream,
    /// Fetch the file list and pass it to [`Classifier::apply_file_list`].
    RefreshFiles,
    /// Sample the heaters and pass them to [`Classifier::confirm_print_start`].
    ConfirmPrintStart,
}

fn notify(text: impl Into<String>) -> Effect {
    Effect::Notify(text.into())
}

/// Stateful event classifier.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    state: PrinterState,
    files: Option<FileSet>,
    primed: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored printer state.
    pub fn state(&self) -> &PrinterState {
        &self.state
    }

    /// The stored file snapshot, if one has been taken.
    pub fn files(&self) -> Option<&FileSet> {
        self.files.as_ref()
    }

    /// Whether a print is confirmed in progress.
    pub fn is_printing(&self) -> bool {
        self.state.has_started_printing
    }

    /// Classify one event.
    pub fn classify(&mut self, event: &PrinterEvent) -> Vec<Effect> {
        match event {
            PrinterEvent::Snapshot(status) if !self.primed => {
                self.prime(status);
                Vec::new()
            }
            PrinterEvent::Snapshot(status) => self.status_update(status),
            PrinterEvent::StatusUpdate(status) => self.status_update(status),
            PrinterEvent::Controller(fault) => controller_fault(*fault),
            PrinterEvent::FileListChanged => vec![Effect::RefreshFiles],
            PrinterEvent::GcodeResponse(line) => gcode_response(line),
        }
    }

    /// Store a full status as the baseline without announcing anything.
    fn prime(&mut self, status: &StatusUpdate) {
        let state = &mut self.state;

        if let Some(value) = status.klipper.as_ref().and_then(|k| k.state.clone()) {
            state.klipper_state = Some(value);
        }
        if let Some(value) = status.mcu.as_ref().and_then(|m| m.state.clone()) {
            state.mcu_state = Some(value);
        }
        if let Some(stats) = &status.print_stats {
            if let Some(print_state) = &stats.state {
                let printing = PrintState::parse(print_state).is_printing();
                // A job already running when we attach is not announced again
                state.has_started_printing = printing;
                state.start_notified = printing;
                state.print_state = Some(print_state.clone());
            }
            if stats.filename.is_some() {
                state.filename = stats.filename.clone();
            }
        }
        if let Some(target) = status.heater_bed.as_ref().and_then(|h| h.target) {
            state.bed_target = Some(target);
        }
        if let Some(target) = status.extruder.as_ref().and_then(|h| h.target) {
            state.extruder_target = Some(target);
        }
        if let Some(position) = status.toolhead.as_ref().and_then(|t| t.position.clone()) {
            state.position = Some(position);
        }

        debug!("Primed printer state: {:?}", state);
        self.primed = true;
    }

    fn status_update(&mut self, status: &StatusUpdate) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let Some(klipper) = &status.klipper {
            self.klipper(klipper, &mut effects);
        }
        if let Some(mcu) = &status.mcu {
            self.mcu(mcu, &mut effects);
        }
        if let Some(stats) = &status.print_stats {
            self.print_stats(stats, &mut effects);
        }
        if let Some(bed) = &status.heater_bed {
            self.heater_target(Heater::Bed, bed, &mut effects);
        }
        if let Some(extruder) = &status.extruder {
            self.heater_target(Heater::Extruder, extruder, &mut effects);
        }
        if let Some(toolhead) = &status.toolhead {
            self.toolhead(toolhead, &mut effects);
        }

        effects
    }

    fn klipper(&mut self, status: &ControllerStatus, effects: &mut Vec<Effect>) {
        let Some(new_state) = &status.state else {
            return;
        };
        if self.state.klipper_state.as_ref() == Some(new_state) {
            return;
        }

        effects.push(notify(format!("Klipper state: {}", new_state)));
        if let Some(message) = status.state_message.as_deref().map(str::trim) {
            if !message.is_empty() {
                effects.push(notify(format!("Status message: {}", message)));
            }
        }
        if is_failure(new_state, KLIPPER_FAILURE_STATES) {
            effects.push(notify(format!(
                "Lost connection to the printer: {}",
                new_state
            )));
        }

        self.state.klipper_state = Some(new_state.clone());
    }

    fn mcu(&mut self, status: &ControllerStatus, effects: &mut Vec<Effect>) {
        let Some(new_state) = &status.state else {
            return;
        };
        if self.state.mcu_state.as_ref() == Some(new_state) {
            return;
        }

        effects.push(notify(format!("MCU state: {}", new_state)));
        if is_failure(new_state, MCU_FAILURE_STATES) {
            effects.push(notify(format!(
                "Lost connection to the printer, MCU entered state {}",
                new_state
            )));
        }

        self.state.mcu_state = Some(new_state.clone());
    }

    fn print_stats(&mut self, stats: &PrintStats, effects: &mut Vec<Effect>) {
        if stats.filename.is_some() {
            self.state.filename = stats.filename.clone();
        }

        let Some(raw) = &stats.state else {
            return;
        };
        if self.state.print_state.as_ref() == Some(raw) {
            return;
        }

        let print_state = PrintState::parse(raw);
        info!("Print state changed to {}", print_state);

        let text = match &print_state {
            PrintState::Printing => match self.state.filename.as_deref() {
                Some(filename) if !filename.is_empty() => {
                    format!("Now printing: {}", strip_extension(filename))
                }
                _ => "A print has started.".to_string(),
            },
            PrintState::Paused => "The print has been paused.".to_string(),
            PrintState::Error => "An error occurred during the print!".to_string(),
            PrintState::Complete => "The print has finished successfully.".to_string(),
            PrintState::Standby => "The printer is on standby.".to_string(),
            PrintState::Cancelled => "The print has been cancelled.".to_string(),
            PrintState::Ready => "The printer is ready.".to_string(),
            PrintState::Unknown(other) => format!("Unknown print state: {}", other),
        };
        effects.push(notify(text));

        if print_state.is_printing() {
            self.state.has_started_printing = true;
            self.state.start_notified = false;
        } else if print_state.ends_job() {
            self.state.end_job();
        }

        self.state.print_state = Some(raw.clone());
    }

    fn heater_target(&mut self, heater: Heater, status: &HeaterStatus, effects: &mut Vec<Effect>) {
        let Some(target) = status.target else {
            return;
        };
        let stored = match heater {
            Heater::Bed => &mut self.state.bed_target,
            Heater::Extruder => &mut self.state.extruder_target,
        };
        if *stored == Some(target) {
            return;
        }
        *stored = Some(target);

        if self.state.has_started_printing {
            return;
        }

        if target != 0.0 {
            effects.push(Effect::ArmTemperatureWatch);
            effects.push(notify(format!(
                "New {} temperature target: {}°C",
                heater,
                format_celsius(target)
            )));
        } else {
            effects.push(notify(format!("Cooling the {}", heater)));
        }
    }

    fn toolhead(&mut self, status: &ToolheadStatus, effects: &mut Vec<Effect>) {
        let Some(position) = &status.position else {
            return;
        };

        // The first report is a baseline, not a move
        let moved = matches!(&self.state.position, Some(previous) if previous != position);
        self.state.position = Some(position.clone());

        if moved && self.state.has_started_printing && !self.state.start_notified {
            effects.push(Effect::ConfirmPrintStart);
        }
    }

    /// Replace the file snapshot, announcing added and removed files.
    ///
    /// The first snapshot ever taken is stored silently as the baseline.
    pub fn apply_file_list(&mut self, files: Vec<String>) -> Vec<Effect> {
        let next = FileSet::new(files);

        let Some(previous) = self.files.replace(next.clone()) else {
            debug!("File baseline taken: {} files", next.len());
            return Vec::new();
        };

        let diff = previous.diff(&next);
        let mut effects = Vec::with_capacity(diff.added.len() + diff.removed.len());
        for name in &diff.added {
            effects.push(notify(format!(
                "A new file was added: {}",
                strip_extension(name)
            )));
        }
        for name in &diff.removed {
            effects.push(notify(format!("A file was removed: {}", strip_extension(name))));
        }
        effects
    }

    /// Announce that printing has begun if both heaters are near target.
    ///
    /// Fires at most once per entry into `printing`.
    pub fn confirm_print_start(&mut self, heaters: &HeaterSnapshot) -> Vec<Effect> {
        if !self.state.has_started_printing || self.state.start_notified {
            return Vec::new();
        }
        if !heaters.ready_to_print() {
            return Vec::new();
        }

        self.state.start_notified = true;
        vec![notify("The printer has begun printing.")]
    }
}

fn is_failure(state: &str, failures: &[&str]) -> bool {
    let state = state.to_lowercase();
    failures.contains(&state.as_str())
}

fn controller_fault(fault: ControllerFault) -> Vec<Effect> {
    match fault {
        ControllerFault::Shutdown | ControllerFault::Disconnected => {
            let mut effects = vec![notify(format!(
                "Lost connection to the printer: {}",
                fault.label()
            ))];
            if fault == ControllerFault::Disconnected {
                effects.push(Effect::StartReconnectWatch);
                effects.push(Effect::CloseStream);
            }
            effects
        }
        ControllerFault::Error => vec![notify(format!("Error: {}", fault.label()))],
    }
}

fn gcode_response(line: &str) -> Vec<Effect> {
    let Some(index) = line.find(MACRO_MARKER) else {
        return Vec::new();
    };
    let name = line[index + MACRO_MARKER.len()..].trim();
    if name.is_empty() {
        return Vec::new();
    }
    vec![notify(format!("Macro executed: {}", name))]
}
