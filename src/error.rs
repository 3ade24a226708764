//! Error types for the monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems found at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No relay credential in the environment.
    #[error("API_KEY is not set; export PRINTWATCH_API_KEY or API_KEY")]
    MissingCredential,

    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failures acquiring the single-instance lock.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Another process holds the lock.
    #[error("Another instance is already running (lock held on {})", .0.display())]
    AlreadyRunning(PathBuf),

    /// The lock or marker file could not be created or written.
    #[error("Lock file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures handing a notification to the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay connection is currently down.
    #[error("No relay connection")]
    NotConnected,

    /// The relay task has stopped.
    #[error("Relay channel closed")]
    Closed,

    /// The payload could not be encoded.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An inbound status stream frame that could not be decoded.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A known method arrived without the parameters it requires.
    #[error("Missing parameters for {0}")]
    MissingParams(&'static str),
}

/// A WebSocket session ended abnormally.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect, send or receive failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// An outbound message could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
