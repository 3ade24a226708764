//! Status stream from the printer host.
//!
//! [`StatusStreamClient`] owns the WebSocket connection and its reconnect
//! loop; [`decode_frame`] turns each text frame into a
//! [`PrinterEvent`](printwatch_types::PrinterEvent).

mod frame;
mod stream;

pub use frame::decode_frame;
pub use stream::{StatusStreamClient, StreamState, RECONNECT_DELAY};
