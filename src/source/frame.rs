//! Decoding of status stream frames into [`PrinterEvent`]s.

use printwatch_types::{
    ControllerFault, PrinterEvent, StatusUpdate, SubscribeRequest, METHOD_FILELIST_CHANGED,
    METHOD_GCODE_RESPONSE, METHOD_KLIPPY_DISCONNECTED, METHOD_KLIPPY_ERROR,
    METHOD_KLIPPY_SHUTDOWN, METHOD_STATUS_UPDATE,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FrameError;

/// Any JSON-RPC message the host may send: a notification carries
/// `method`/`params`, a response carries `id`/`result`.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<SubscribeResult>,
}

#[derive(Debug, Deserialize)]
struct SubscribeResult {
    #[serde(default)]
    status: Option<StatusUpdate>,
}

/// Decode one text frame.
///
/// Frames the monitor has no interest in decode to `Ok(None)`.
pub fn decode_frame(text: &str) -> Result<Option<PrinterEvent>, FrameError> {
    let frame: Frame = serde_json::from_str(text)?;

    let Some(method) = frame.method.as_deref() else {
        return Ok(subscribe_response(frame));
    };

    let event = match method {
        METHOD_STATUS_UPDATE => {
            let status = frame
                .params
                .into_iter()
                .next()
                .ok_or(FrameError::MissingParams(METHOD_STATUS_UPDATE))?;
            PrinterEvent::StatusUpdate(serde_json::from_value(status)?)
        }
        METHOD_KLIPPY_SHUTDOWN => PrinterEvent::Controller(ControllerFault::Shutdown),
        METHOD_KLIPPY_DISCONNECTED => PrinterEvent::Controller(ControllerFault::Disconnected),
        METHOD_KLIPPY_ERROR => PrinterEvent::Controller(ControllerFault::Error),
        METHOD_FILELIST_CHANGED => PrinterEvent::FileListChanged,
        METHOD_GCODE_RESPONSE => {
            let line = frame
                .params
                .first()
                .and_then(Value::as_str)
                .ok_or(FrameError::MissingParams(METHOD_GCODE_RESPONSE))?;
            PrinterEvent::GcodeResponse(line.to_string())
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

fn subscribe_response(frame: Frame) -> Option<PrinterEvent> {
    let id = frame.id.as_ref().and_then(Value::as_u64)?;
    if id != SubscribeRequest::ID {
        return None;
    }
    frame
        .result
        .and_then(|result| result.status)
        .map(PrinterEvent::Snapshot)
}
