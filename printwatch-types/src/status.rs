//! Status objects carried by `notify_status_update` frames.
//!
//! The printer host only sends the fields that changed since the previous
//! update, so every field here is optional and absent objects stay `None`.

/// The set of subscribed printer objects in one status update.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatusUpdate {
    /// Firmware controller (Klipper) health.
    pub klipper: Option<ControllerStatus>,

    /// Microcontroller health.
    pub mcu: Option<ControllerStatus>,

    /// Print job statistics.
    pub print_stats: Option<PrintStats>,

    /// Heated bed.
    pub heater_bed: Option<HeaterStatus>,

    /// Hotend.
    pub extruder: Option<HeaterStatus>,

    /// Toolhead kinematics.
    pub toolhead: Option<ToolheadStatus>,
}

impl StatusUpdate {
    /// Check if the update carries no watched object.
    pub fn is_empty(&self) -> bool {
        self.klipper.is_none()
            && self.mcu.is_none()
            && self.print_stats.is_none()
            && self.heater_bed.is_none()
            && self.extruder.is_none()
            && self.toolhead.is_none()
    }
}

/// Health of the firmware controller or one of its MCUs.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerStatus {
    pub state: Option<String>,
    pub state_message: Option<String>,
}

/// Print job state and the file being printed.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrintStats {
    pub state: Option<String>,
    pub filename: Option<String>,
}

/// A heater's current temperature and target, in °C.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeaterStatus {
    pub temperature: Option<f64>,
    pub target: Option<f64>,
}

/// Toolhead position as `[x, y, z, e]`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ToolheadStatus {
    pub position: Option<Vec<f64>>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_decodes() {
        let json = r#"{"heater_bed":{"temperature":41.2},"print_stats":{"print_duration":12.5}}"#;
        let update: StatusUpdate = serde_json::from_str(json).unwrap();

        let bed = update.heater_bed.unwrap();
        assert_eq!(bed.temperature, Some(41.2));
        assert_eq!(bed.target, None);

        // Unknown fields are ignored, known ones stay unset
        let stats = update.print_stats.unwrap();
        assert_eq!(stats.state, None);
        assert!(update.toolhead.is_none());
    }

    #[test]
    fn test_empty_update() {
        let update: StatusUpdate = serde_json::from_str(r#"{"webhooks":{"state":"ready"}}"#).unwrap();
        assert!(update.is_empty());
    }
}
