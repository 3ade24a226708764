//! Wiring of the monitor's tasks.
//!
//! ```text
//!  status stream ──▶ Monitor ──▶ NotificationQueue ──▶ Dispatcher ──▶ RelayClient
//!                      │  ▲            ▲      ▲
//!                      ▼  │            │      │
//!                 PrinterHost ◀── TemperatureWatcher
//!                      ▲                      │
//!                      └──── ReconnectWatcher ┘
//! ```

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use printwatch_adapters::{MoonrakerAdapter, PrinterHost};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Settings;
use crate::guard::StartKind;
use crate::monitor::Monitor;
use crate::notify::{NotificationDispatcher, NotificationQueue};
use crate::relay::RelayClient;
use crate::source::StatusStreamClient;
use crate::watch::{ReconnectWatcher, TemperatureWatcher};

/// How long startup waits for the relay before the first delivery.
pub const RELAY_STARTUP_GRACE: Duration = Duration::from_secs(5);

/// The running monitor.
pub struct App {
    settings: Settings,
    host: Arc<dyn PrinterHost>,
}

impl App {
    /// Build the app against the printer host named in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let adapter = MoonrakerAdapter::builder()
            .endpoint(settings.printer_url.as_str())
            .timeout(settings.http_timeout())
            .build()
            .context("Failed to build printer host client")?;
        Ok(Self::with_host(settings, Arc::new(adapter)))
    }

    /// Build the app against any printer host.
    pub fn with_host(settings: Settings, host: Arc<dyn PrinterHost>) -> Self {
        Self { settings, host }
    }

    /// Start every task, announce the start, and run until `shutdown`
    /// completes.
    pub async fn run<F>(self, start: StartKind, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let settings = &self.settings;
        let (queue, receiver) =
            NotificationQueue::new(settings.dedup_window(), settings.queue_capacity);
        let printing = Arc::new(AtomicBool::new(false));

        let temperature = TemperatureWatcher::new(self.host.clone(), queue.clone(), printing.clone())
            .with_period(settings.temperature_poll());
        let reconnect = ReconnectWatcher::new(self.host.clone(), queue.clone())
            .with_timing(settings.reconnection_timeout(), settings.reconnection_poll());
        let mut monitor = Monitor::new(
            self.host.clone(),
            queue.clone(),
            temperature.handle(),
            reconnect,
            printing,
        );

        monitor.prime_files().await;
        queue.add(start.announcement());

        let (relay, relay_handle) =
            RelayClient::new(settings.relay_url.as_str(), settings.credential());
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        tasks.push(relay.with_reconnect_delay(settings.reconnect_delay()).spawn());

        if !relay_handle.wait_connected(RELAY_STARTUP_GRACE).await {
            warn!("Relay not connected yet, early notifications may be dropped");
        }

        tasks.push(
            NotificationDispatcher::new(receiver, Arc::new(relay_handle))
                .with_cooldown(settings.dispatch_cooldown())
                .spawn(),
        );
        tasks.push(temperature.spawn());
        tasks.push(
            StatusStreamClient::new(settings.printer_ws_url.as_str(), monitor)
                .with_reconnect_delay(settings.reconnect_delay())
                .spawn(),
        );
        info!("Monitor running ({:?} start)", start);

        shutdown.await;

        info!("Shutting down");
        for task in &tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("printer_url", &self.settings.printer_url)
            .field("relay_url", &self.settings.relay_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::testing::FakeHost;

    const WAIT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_startup_announcement_reaches_relay() {
        let relay = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let printer = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let settings = Settings {
            relay_url: format!("ws://{}/ws", relay.local_addr().unwrap()),
            printer_ws_url: format!("ws://{}/websocket", printer.local_addr().unwrap()),
            api_key: Some("secret".to_string()),
            ..Settings::default()
        };
        let host = Arc::new(FakeHost::with_files(&["benchy.gcode"]));
        let app = App::with_host(settings, host);

        let (stop, stopped) = oneshot::channel::<()>();
        let running = tokio::spawn(app.run(StartKind::Restarted, async {
            let _ = stopped.await;
        }));

        let (tcp, _) = timeout(WAIT, relay.accept()).await.unwrap().unwrap();
        let mut socket = accept_async(tcp).await.unwrap();

        let Some(Ok(Message::Text(text))) = timeout(WAIT, socket.next()).await.unwrap() else {
            panic!("expected a relay payload");
        };
        let payload: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["API_KEY"], "secret");
        assert_eq!(
            payload["text"],
            "Notify:The notification service has been restarted."
        );

        stop.send(()).unwrap();
        timeout(WAIT, running).await.unwrap().unwrap();
    }
}
