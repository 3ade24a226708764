//! # printwatch
//!
//! A long-running monitor that watches a Moonraker-class printer host and
//! turns its live status stream into short, human-phrased notifications
//! for a downstream relay (typically a speech layer).
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   frames   ┌─────────┐  effects  ┌──────────────────┐
//! │ StatusStream  │──────────▶│ Monitor │─────────▶│ Notification     │
//! │ Client        │            │(classify)│           │ Queue (dedup)    │
//! └───────────────┘            └────┬────┘           └────────┬─────────┘
//!                                   │ arm / start              │ FIFO
//!                      ┌────────────┴───────────┐             ▼
//!                      │ TemperatureWatcher      │     ┌───────────────┐
//!                      │ ReconnectWatcher        │────▶│ Dispatcher    │──▶ RelayClient
//!                      └─────────────────────────┘     └───────────────┘
//! ```
//!
//! - **[`events`]**: pure classification of [`PrinterEvent`](printwatch_types::PrinterEvent)s
//!   into [`Effect`]s
//! - **[`monitor`]**: applies effects, owning all printer state
//! - **[`notify`]**: the deduplicating queue and its paced dispatcher
//! - **[`watch`]**: temperature and reconnection watchers
//! - **[`source`]**: the status stream client and frame decoding
//! - **[`relay`]**: the downstream WebSocket connection
//! - **[`guard`]**: single-instance lock and run marker
//!
//! ## Usage
//!
//! ```bash
//! API_KEY=secret printwatch --config /etc/printwatch.toml
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod guard;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod relay;
pub mod source;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use app::App;
pub use config::Settings;
pub use data::{DedupHistory, FileSet, PrinterState};
pub use error::{ConfigError, FrameError, GuardError, RelayError, TransportError};
pub use events::{Classifier, Effect};
pub use guard::{InstanceGuard, RunMarker, StartKind, EXIT_ALREADY_RUNNING};
pub use monitor::{Flow, Monitor};
pub use notify::{NotificationDispatcher, NotificationQueue, NotificationSink, PendingNotification};
pub use relay::{RelayClient, RelayHandle};
pub use source::{decode_frame, StatusStreamClient, StreamState};
pub use watch::{ReconnectWatcher, TemperatureHandle, TemperatureWatcher};
