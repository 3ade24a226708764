//! Moonraker adapter using the host's HTTP API.
//!
//! Moonraker is typically available on port 7125. Every response wraps its
//! payload in a `result` member, which this adapter unwraps.
//!
//! ## Endpoints Used
//!
//! - `GET /printer/objects/query?heater_bed&extruder` - heater temperatures and targets
//! - `GET /server/files/list` - files stored on the host
//! - `GET /server/info` - firmware (`klippy_state`) health
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use printwatch_adapters::moonraker::MoonrakerAdapter;
//! use printwatch_adapters::PrinterHost;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MoonrakerAdapter::builder()
//!         .endpoint("http://printer.local:7125")
//!         .timeout(Duration::from_secs(2))
//!         .build()?;
//!
//!     for file in adapter.file_list().await? {
//!         println!("{}", file);
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use printwatch_types::{HeaterReading, HeaterSnapshot, HeaterStatus, ServerInfo};

use crate::{AdapterError, PrinterHost};

/// Moonraker adapter for polling printer state.
#[derive(Debug, Clone)]
pub struct MoonrakerAdapter {
    client: Client,
    endpoint: String,
}

impl MoonrakerAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> MoonrakerAdapterBuilder {
        MoonrakerAdapterBuilder::default()
    }

    /// The base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        let url = format!("{}/{}", self.endpoint, path);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(envelope.result)
    }
}

#[async_trait]
impl PrinterHost for MoonrakerAdapter {
    async fn heaters(&self) -> Result<HeaterSnapshot, AdapterError> {
        let query: ObjectsQuery = self.get("printer/objects/query?heater_bed&extruder").await?;
        Ok(query.into_snapshot())
    }

    async fn file_list(&self) -> Result<Vec<String>, AdapterError> {
        let files: Vec<FileEntry> = self.get("server/files/list").await?;
        Ok(files.into_iter().filter_map(FileEntry::into_name).collect())
    }

    async fn server_info(&self) -> Result<ServerInfo, AdapterError> {
        self.get("server/info").await
    }
}

/// Builder for MoonrakerAdapter.
#[derive(Debug, Default)]
pub struct MoonrakerAdapterBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl MoonrakerAdapterBuilder {
    /// Set the HTTP endpoint (e.g., "http://localhost:7125").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-request timeout (default: 3 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<MoonrakerAdapter, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(3));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://127.0.0.1:7125".to_string());

        Ok(MoonrakerAdapter {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

/// Every Moonraker response carries its payload under `result`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

/// Result of an object query.
#[derive(Debug, Deserialize)]
struct ObjectsQuery {
    #[serde(default)]
    status: QueriedHeaters,
}

#[derive(Debug, Default, Deserialize)]
struct QueriedHeaters {
    heater_bed: Option<HeaterStatus>,
    extruder: Option<HeaterStatus>,
}

impl ObjectsQuery {
    fn into_snapshot(self) -> HeaterSnapshot {
        HeaterSnapshot {
            bed: self.status.heater_bed.and_then(reading),
            extruder: self.status.extruder.and_then(reading),
        }
    }
}

fn reading(status: HeaterStatus) -> Option<HeaterReading> {
    Some(HeaterReading::new(status.temperature?, status.target?))
}

/// One entry of the file list. Older hosts report `display`, newer ones `path`.
#[derive(Debug, Deserialize)]
struct FileEntry {
    display: Option<String>,
    path: Option<String>,
}

impl FileEntry {
    fn into_name(self) -> Option<String> {
        self.display.or(self.path)
    }
}
