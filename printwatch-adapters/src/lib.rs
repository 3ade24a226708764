//! # printwatch-adapters
//!
//! Request/response access to a printer host, used by the monitor for the
//! queries that are not carried on the status stream.
//!
//! ## Supported Hosts
//!
//! - **Moonraker** (`moonraker` feature, default) - Queries heater state, the
//!   file list and firmware health via the Moonraker HTTP API
//!
//! ## Quick Start (Moonraker)
//!
//! ```rust,no_run
//! use printwatch_adapters::moonraker::MoonrakerAdapter;
//! use printwatch_adapters::PrinterHost;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MoonrakerAdapter::builder()
//!         .endpoint("http://localhost:7125")
//!         .build()?;
//!
//!     let heaters = adapter.heaters().await?;
//!     println!("Bed: {:?}", heaters.bed);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

pub mod error;

#[cfg(feature = "moonraker")]
pub mod moonraker;

pub use error::AdapterError;

#[cfg(feature = "moonraker")]
pub use moonraker::{MoonrakerAdapter, MoonrakerAdapterBuilder};

// Re-export types for convenience
pub use printwatch_types::{HeaterReading, HeaterSnapshot, ServerInfo};

/// Polling surface of a printer host.
///
/// Every call is expected to give up after a short timeout, so a slow host
/// never stalls the caller for long.
#[async_trait]
pub trait PrinterHost: Send + Sync {
    /// Current temperature and target of the bed and extruder.
    async fn heaters(&self) -> Result<HeaterSnapshot, AdapterError>;

    /// Names of every file stored on the host.
    async fn file_list(&self) -> Result<Vec<String>, AdapterError>;

    /// Server health, including the firmware state.
    async fn server_info(&self) -> Result<ServerInfo, AdapterError>;
}
