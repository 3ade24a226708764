//! State the monitor keeps about the printer.
//!
//! - [`PrinterState`]: last values the classifier stored for each watched field
//! - [`FileSet`]: snapshot of files known to exist on the printer host
//! - [`DedupHistory`]: recently accepted notifications, for duplicate suppression

pub mod history;

pub use history::{DedupHistory, NotificationRecord, DEDUP_WINDOW};

use std::collections::BTreeSet;

/// Last-stored value of every field the classifier watches.
///
/// Only the classifier writes this. A field change is notification-worthy
/// only when it differs from the value stored here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrinterState {
    pub klipper_state: Option<String>,
    pub mcu_state: Option<String>,
    pub print_state: Option<String>,
    pub filename: Option<String>,
    pub bed_target: Option<f64>,
    pub extruder_target: Option<f64>,
    pub position: Option<Vec<f64>>,
    /// A print job has been entered and not yet left.
    pub has_started_printing: bool,
    /// "Begun printing" already fired for the current job.
    pub start_notified: bool,
}

impl PrinterState {
    /// Reset the per-job flags.
    pub fn end_job(&mut self) {
        self.has_started_printing = false;
        self.start_notified = false;
    }
}

/// Difference between two file snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl FileDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Files known to exist on the printer host.
///
/// Always replaced as a whole; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeSet<String>,
}

impl FileSet {
    pub fn new(files: impl IntoIterator<Item = String>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }

    /// Files in `next` missing here, and files here missing in `next`.
    pub fn diff(&self, next: &FileSet) -> FileDiff {
        FileDiff {
            added: next.files.difference(&self.files).cloned().collect(),
            removed: self.files.difference(&next.files).cloned().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Strip the extension from the last path segment of a file name.
///
/// Directory components are kept; dotfiles keep their leading dot.
pub fn strip_extension(name: &str) -> &str {
    let segment_start = name.rfind('/').map(|i| i + 1).unwrap_or(0);
    match name[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &name[..segment_start + dot],
        _ => name,
    }
}
