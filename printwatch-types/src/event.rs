//! Events decoded from the printer host's status stream, and the request
//! that subscribes to them.

use std::collections::BTreeMap;

use crate::StatusUpdate;

/// Method name of a status update notification frame.
pub const METHOD_STATUS_UPDATE: &str = "notify_status_update";
/// Method name sent when the firmware controller shuts down.
pub const METHOD_KLIPPY_SHUTDOWN: &str = "notify_klippy_shutdown";
/// Method name sent when the host loses its firmware connection.
pub const METHOD_KLIPPY_DISCONNECTED: &str = "notify_klippy_disconnected";
/// Method name sent when the firmware controller enters an error state.
pub const METHOD_KLIPPY_ERROR: &str = "notify_klippy_error";
/// Method name sent when a file is added to or removed from the host.
pub const METHOD_FILELIST_CHANGED: &str = "notify_filelist_changed";
/// Method name carrying console output of executed G-code.
pub const METHOD_GCODE_RESPONSE: &str = "notify_gcode_response";

/// Kind of firmware controller fault announced by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerFault {
    Shutdown,
    Disconnected,
    Error,
}

impl ControllerFault {
    /// Human label derived from the notification method, e.g. "Klippy Shutdown".
    pub fn label(&self) -> &'static str {
        match self {
            ControllerFault::Shutdown => "Klippy Shutdown",
            ControllerFault::Disconnected => "Klippy Disconnected",
            ControllerFault::Error => "Klippy Error",
        }
    }
}

/// A single decoded event from the status stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PrinterEvent {
    /// Current values of every subscribed object, returned in answer to the
    /// subscription request.
    Snapshot(StatusUpdate),

    /// Changed fields of the subscribed objects.
    StatusUpdate(StatusUpdate),

    /// The firmware controller shut down, disconnected or errored.
    Controller(ControllerFault),

    /// The host's file list changed; the new list must be fetched.
    FileListChanged,

    /// One line of G-code console output.
    GcodeResponse(String),
}

/// Server health as reported by the host's info endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ServerInfo {
    pub klippy_state: String,
}

impl ServerInfo {
    /// Whether the firmware is back in a ready or standby state.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.klippy_state.to_lowercase().as_str(),
            "ready" | "standby"
        )
    }
}

/// JSON-RPC request subscribing to printer objects.
///
/// Each object maps to the list of fields to watch, or `None` for all fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubscribeRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: SubscribeParams,
    pub id: u64,
}

/// Parameters of a [`SubscribeRequest`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubscribeParams {
    pub objects: BTreeMap<&'static str, Option<Vec<&'static str>>>,
    /// Ask the host to answer with the current value of every object.
    pub retrieve_objects: bool,
}

impl SubscribeRequest {
    /// Request id used for the subscription, so its response can be recognised.
    pub const ID: u64 = 1;

    /// The subscription covering every object the monitor watches.
    pub fn watched_objects() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert("heater_bed", None);
        objects.insert("extruder", None);
        objects.insert("print_stats", Some(vec!["state", "filename"]));
        objects.insert("toolhead", Some(vec!["position"]));
        objects.insert("klipper", Some(vec!["state", "state_message"]));
        objects.insert("mcu", Some(vec!["state"]));

        Self {
            jsonrpc: "2.0",
            method: "printer.objects.subscribe",
            params: SubscribeParams {
                objects,
                retrieve_objects: true,
            },
            id: Self::ID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_ready() {
        let info = ServerInfo {
            klippy_state: "Standby".to_string(),
        };
        assert!(info.is_ready());

        let info = ServerInfo {
            klippy_state: "startup".to_string(),
        };
        assert!(!info.is_ready());
    }

    #[test]
    fn test_watched_objects() {
        let request = SubscribeRequest::watched_objects();
        assert!(request.params.retrieve_objects);
        assert_eq!(request.params.objects.len(), 6);
        assert_eq!(request.params.objects["heater_bed"], None);
        assert_eq!(
            request.params.objects["print_stats"],
            Some(vec!["state", "filename"])
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_subscribe_request_wire_format() {
        let value = serde_json::to_value(SubscribeRequest::watched_objects()).unwrap();
        assert_eq!(value["method"], "printer.objects.subscribe");
        assert_eq!(value["params"]["objects"]["extruder"], serde_json::Value::Null);
        assert_eq!(value["params"]["objects"]["mcu"][0], "state");
        assert_eq!(value["params"]["retrieve_objects"], true);
        assert_eq!(value["id"], 1);
    }
}
