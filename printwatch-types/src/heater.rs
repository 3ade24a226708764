//! Heater readings and the tolerances used to judge them.

use std::fmt;

/// Distance from target, in °C, within which a heater counts as having
/// reached its target.
pub const TEMPERATURE_TOLERANCE: f64 = 0.5;

/// Distance from target, in °C, within which both heaters must sit for a
/// toolhead move to confirm that a print has really started.
///
/// Deliberately looser than [`TEMPERATURE_TOLERANCE`].
pub const PRINT_START_TOLERANCE: f64 = 2.0;

/// One of the two heaters the monitor watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heater {
    Bed,
    Extruder,
}

impl Heater {
    /// Both heaters, bed first.
    pub const ALL: [Heater; 2] = [Heater::Bed, Heater::Extruder];

    /// Printer object name of this heater.
    pub fn object_name(&self) -> &'static str {
        match self {
            Heater::Bed => "heater_bed",
            Heater::Extruder => "extruder",
        }
    }
}

impl fmt::Display for Heater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heater::Bed => write!(f, "bed"),
            Heater::Extruder => write!(f, "extruder"),
        }
    }
}

/// A single temperature sample for one heater.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterReading {
    pub temperature: f64,
    pub target: f64,
}

impl HeaterReading {
    pub fn new(temperature: f64, target: f64) -> Self {
        Self {
            temperature,
            target,
        }
    }

    /// Whether the heater is within `tolerance` of its target.
    pub fn within(&self, tolerance: f64) -> bool {
        (self.temperature - self.target).abs() <= tolerance
    }

    /// Whether the heater has a nonzero target and sits within
    /// [`TEMPERATURE_TOLERANCE`] of it.
    pub fn is_settled(&self) -> bool {
        self.target != 0.0 && self.within(TEMPERATURE_TOLERANCE)
    }
}

/// Bed and extruder readings taken together.
///
/// A heater is `None` when the printer host did not report both its
/// temperature and its target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeaterSnapshot {
    pub bed: Option<HeaterReading>,
    pub extruder: Option<HeaterReading>,
}

impl HeaterSnapshot {
    /// Get the reading for a specific heater.
    pub fn get(&self, heater: Heater) -> Option<HeaterReading> {
        match heater {
            Heater::Bed => self.bed,
            Heater::Extruder => self.extruder,
        }
    }

    /// Whether both heaters are known and within [`PRINT_START_TOLERANCE`].
    pub fn ready_to_print(&self) -> bool {
        match (self.bed, self.extruder) {
            (Some(bed), Some(extruder)) => {
                bed.within(PRINT_START_TOLERANCE) && extruder.within(PRINT_START_TOLERANCE)
            }
            _ => false,
        }
    }
}

/// Render a temperature for speech: integral values lose the fractional part.
///
/// ```rust
/// use printwatch_types::format_celsius;
///
/// assert_eq!(format_celsius(200.0), "200");
/// assert_eq!(format_celsius(199.5), "199.5");
/// ```
pub fn format_celsius(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_needs_nonzero_target() {
        assert!(!HeaterReading::new(0.2, 0.0).is_settled());
        assert!(HeaterReading::new(199.6, 200.0).is_settled());
        assert!(!HeaterReading::new(199.4, 200.0).is_settled());
    }

    #[test]
    fn test_ready_to_print_uses_wider_tolerance() {
        let snapshot = HeaterSnapshot {
            bed: Some(HeaterReading::new(58.5, 60.0)),
            extruder: Some(HeaterReading::new(211.0, 210.0)),
        };
        assert!(snapshot.ready_to_print());
        assert!(!snapshot.bed.unwrap().is_settled());
    }

    #[test]
    fn test_ready_to_print_requires_both() {
        let snapshot = HeaterSnapshot {
            bed: Some(HeaterReading::new(60.0, 60.0)),
            extruder: None,
        };
        assert!(!snapshot.ready_to_print());
    }

    #[test]
    fn test_format_celsius() {
        assert_eq!(format_celsius(60.0), "60");
        assert_eq!(format_celsius(215.3), "215.3");
    }
}
