//! Runtime settings.
//!
//! Settings come from an optional TOML file layered under `PRINTWATCH_*`
//! environment variables. Every field has a default, except the relay
//! credential which must be supplied through the environment.
//!
//! ```toml
//! printer_url = "http://127.0.0.1:7125"
//! printer_ws_url = "ws://127.0.0.1:7125/websocket"
//! relay_url = "ws://127.0.0.1:6996/ws"
//! dedup_window_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "PRINTWATCH";

/// Fallback variable holding the relay credential.
pub const CREDENTIAL_VAR: &str = "API_KEY";

/// Monitor settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP base URL of the printer host.
    pub printer_url: String,
    /// WebSocket URL of the printer host's status stream.
    pub printer_ws_url: String,
    /// WebSocket URL of the downstream relay.
    pub relay_url: String,
    /// Relay credential.
    pub api_key: Option<String>,
    /// Advisory lock preventing a second instance.
    pub lock_file: PathBuf,
    /// Marker distinguishing a fresh start from a restart.
    pub running_marker: PathBuf,
    /// Log file path.
    pub log_file: PathBuf,
    pub http_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
    pub dedup_window_secs: u64,
    pub dispatch_cooldown_secs: u64,
    pub temperature_poll_secs: u64,
    pub reconnection_timeout_secs: u64,
    pub reconnection_poll_secs: u64,
    pub queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            printer_url: "http://127.0.0.1:7125".to_string(),
            printer_ws_url: "ws://127.0.0.1:7125/websocket".to_string(),
            relay_url: "ws://127.0.0.1:6996/ws".to_string(),
            api_key: None,
            lock_file: PathBuf::from("/tmp/printwatch.lock"),
            running_marker: PathBuf::from("/tmp/printwatch_running"),
            log_file: PathBuf::from("/opt/printwatch/printwatch.log"),
            http_timeout_secs: 3,
            reconnect_delay_secs: 5,
            dedup_window_secs: 30,
            dispatch_cooldown_secs: 2,
            temperature_poll_secs: 1,
            reconnection_timeout_secs: 60,
            reconnection_poll_secs: 2,
            queue_capacity: 256,
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the environment.
    ///
    /// Fails if no credential can be found.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.resolve_credential(std::env::var(CREDENTIAL_VAR).ok())?;
        Ok(settings)
    }

    /// Fill the credential from `fallback` if needed and reject blank values.
    fn resolve_credential(&mut self, fallback: Option<String>) -> Result<(), ConfigError> {
        let credential = self
            .api_key
            .take()
            .or(fallback)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential)?;

        self.api_key = Some(credential);
        Ok(())
    }

    /// The resolved relay credential.
    pub fn credential(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn dispatch_cooldown(&self) -> Duration {
        Duration::from_secs(self.dispatch_cooldown_secs)
    }

    pub fn temperature_poll(&self) -> Duration {
        Duration::from_secs(self.temperature_poll_secs)
    }

    pub fn reconnection_timeout(&self) -> Duration {
        Duration::from_secs(self.reconnection_timeout_secs)
    }

    pub fn reconnection_poll(&self) -> Duration {
        Duration::from_secs(self.reconnection_poll_secs)
    }
}
