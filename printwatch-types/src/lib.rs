//! # printwatch-types
//!
//! Core types for printer event monitoring. This crate defines the data model
//! shared by the printer-host adapters and the monitor itself: decoded status
//! stream events, heater readings, print-state classification and the payload
//! forwarded to the downstream relay.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to decode Moonraker payloads
//! - **Partial updates**: Every status field is optional, since the printer host
//!   only sends the fields that changed
//!
//! ## Features
//!
//! - `serde`: JSON decoding/encoding via serde
//!
//! ## Example
//!
//! ```rust
//! use printwatch_types::{HeaterReading, PrintState};
//!
//! let bed = HeaterReading::new(59.7, 60.0);
//! assert!(bed.is_settled());
//!
//! assert_eq!(PrintState::parse("printing"), PrintState::Printing);
//! assert!(!PrintState::parse("paused").is_printing());
//! ```

mod event;
mod heater;
mod print_state;
mod relay;
mod status;

pub use event::*;
pub use heater::*;
pub use print_state::*;
pub use relay::*;
pub use status::*;
