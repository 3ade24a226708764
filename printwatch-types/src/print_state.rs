//! Print job state classification.

use std::fmt;

/// The classified state of the current print job.
///
/// Raw `print_stats.state` strings are mapped onto a closed set; anything
/// the monitor does not recognise is kept verbatim in [`PrintState::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrintState {
    Printing,
    Paused,
    Error,
    Complete,
    Standby,
    /// Covers both `cancelled` and the transient `cancelling`.
    Cancelled,
    Ready,
    Unknown(String),
}

impl PrintState {
    /// Classify a raw state string as reported by the printer host.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "printing" => PrintState::Printing,
            "paused" => PrintState::Paused,
            "error" => PrintState::Error,
            "complete" => PrintState::Complete,
            "standby" => PrintState::Standby,
            "cancelled" | "cancelling" => PrintState::Cancelled,
            "ready" => PrintState::Ready,
            other => PrintState::Unknown(other.to_string()),
        }
    }

    /// Whether this state means a job is actively printing.
    pub fn is_printing(&self) -> bool {
        matches!(self, PrintState::Printing)
    }

    /// Whether entering this state ends the current job.
    ///
    /// Every state except `printing` and `ready` resets the job flags.
    pub fn ends_job(&self) -> bool {
        !matches!(self, PrintState::Printing | PrintState::Ready)
    }
}

impl fmt::Display for PrintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintState::Printing => write!(f, "printing"),
            PrintState::Paused => write!(f, "paused"),
            PrintState::Error => write!(f, "error"),
            PrintState::Complete => write!(f, "complete"),
            PrintState::Standby => write!(f, "standby"),
            PrintState::Cancelled => write!(f, "cancelled"),
            PrintState::Ready => write!(f, "ready"),
            PrintState::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}
