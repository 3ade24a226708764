//! Status stream client.
//!
//! Keeps a WebSocket subscription to the printer host open for the life of
//! the process. Each text frame is handed to the [`Monitor`]; a dropped
//! connection is retried after a fixed delay, forever.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use printwatch_types::SubscribeRequest;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::monitor::{Flow, Monitor};

/// Default pause between connection attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection state of the status stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Client for the printer host's status stream.
///
/// # Example
///
/// ```no_run
/// # use printwatch::{Monitor, StatusStreamClient};
/// # fn demo(monitor: Monitor) {
/// let client = StatusStreamClient::new("ws://127.0.0.1:7125/websocket", monitor);
/// let state = client.state();
/// let task = client.spawn();
/// # }
/// ```
pub struct StatusStreamClient {
    url: String,
    reconnect_delay: Duration,
    monitor: Monitor,
    state: watch::Sender<StreamState>,
}

impl StatusStreamClient {
    pub fn new(url: impl Into<String>, monitor: Monitor) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
            monitor,
            state,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Run the client on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Connect, subscribe and process frames; reconnect on any failure.
    pub async fn run(mut self) {
        loop {
            self.state.send_replace(StreamState::Connecting);
            match self.session().await {
                Ok(()) => info!("Status stream closed"),
                Err(e) => warn!("Status stream failed: {}", e),
            }
            self.state.send_replace(StreamState::Disconnected);

            info!(
                "Reconnecting to status stream in {}s",
                self.reconnect_delay.as_secs_f32()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn session(&mut self) -> Result<(), TransportError> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        info!("Connected to status stream at {}", self.url);
        let (mut write, mut read) = socket.split();

        let request = serde_json::to_string(&SubscribeRequest::watched_objects())?;
        write.send(Message::Text(request)).await?;
        self.state.send_replace(StreamState::Subscribed);

        while let Some(message) = read.next().await {
            match message? {
                Message::Text(text) => {
                    if self.monitor.handle_text(&text).await == Flow::Reconnect {
                        info!("Closing status stream to force a reconnect");
                        write.send(Message::Close(None)).await?;
                        return Ok(());
                    }
                }
                Message::Close(frame) => {
                    debug!("Status stream close frame: {:?}", frame);
                    return Ok(());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for StatusStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStreamClient")
            .field("url", &self.url)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::Receiver;
    use tokio::time::timeout;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    use crate::data::DEDUP_WINDOW;
    use crate::notify::{NotificationQueue, PendingNotification, QUEUE_CAPACITY};
    use crate::testing::FakeHost;
    use crate::watch::{ReconnectWatcher, TemperatureHandle};

    const WAIT: Duration = Duration::from_secs(5);

    async fn accept(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
        let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        let mut socket = accept_async(tcp).await.unwrap();

        let Some(Ok(Message::Text(request))) = timeout(WAIT, socket.next()).await.unwrap() else {
            panic!("expected a subscription request");
        };
        let request: serde_json::Value = serde_json::from_str(&request).unwrap();
        assert_eq!(request["method"], "printer.objects.subscribe");
        assert_eq!(request["params"]["retrieve_objects"], true);

        socket
    }

    async fn next_message(rx: &mut Receiver<PendingNotification>) -> String {
        timeout(WAIT, rx.recv())
            .await
            .unwrap()
            .unwrap()
            .message()
            .to_string()
    }

    #[tokio::test]
    async fn test_subscribes_classifies_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/websocket", listener.local_addr().unwrap());

        let host = Arc::new(FakeHost::new());
        host.push_state(Some("ready"));
        let (queue, mut rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let monitor = Monitor::new(
            host.clone(),
            queue.clone(),
            TemperatureHandle::default(),
            ReconnectWatcher::new(host.clone(), queue),
            Arc::new(AtomicBool::new(false)),
        );
        let client = StatusStreamClient::new(url, monitor)
            .with_reconnect_delay(Duration::from_millis(50));
        let mut state = client.state();
        let task = client.spawn();

        let mut socket = accept(&listener).await;
        timeout(WAIT, state.wait_for(|s| *s == StreamState::Subscribed))
            .await
            .unwrap()
            .unwrap();

        let frames = [
            r#"{"jsonrpc": "2.0", "result": {"eventtime": 1.0, "status": {"print_stats": {"state": "standby", "filename": ""}}}, "id": 1}"#,
            r#"{"jsonrpc": "2.0", "method": "notify_status_update", "params": [{"print_stats": {"state": "printing", "filename": "cube.gcode"}}, 2.0]}"#,
            r#"{"jsonrpc": "2.0", "method": "notify_klippy_disconnected"}"#,
        ];
        for frame in frames {
            socket.send(Message::Text(frame.to_string())).await.unwrap();
        }

        assert_eq!(next_message(&mut rx).await, "Now printing: cube");
        assert_eq!(
            next_message(&mut rx).await,
            "Lost connection to the printer: Klippy Disconnected"
        );
        assert_eq!(
            next_message(&mut rx).await,
            "The printer firmware restarted and the connection was re-established."
        );

        // The disconnect forces a fresh connection and subscription
        let _second = accept(&listener).await;
        timeout(WAIT, state.wait_for(|s| *s == StreamState::Subscribed))
            .await
            .unwrap()
            .unwrap();

        task.abort();
    }

    #[tokio::test]
    async fn test_retries_when_host_is_down() {
        // Reserve a port, then free it so the first attempts are refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let host = Arc::new(FakeHost::new());
        let (queue, _rx) = NotificationQueue::new(DEDUP_WINDOW, QUEUE_CAPACITY);
        let monitor = Monitor::new(
            host.clone(),
            queue.clone(),
            TemperatureHandle::default(),
            ReconnectWatcher::new(host, queue),
            Arc::new(AtomicBool::new(false)),
        );
        let client = StatusStreamClient::new(format!("ws://{}/websocket", addr), monitor)
            .with_reconnect_delay(Duration::from_millis(20));
        let mut state = client.state();
        let task = client.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_ne!(*state.borrow_and_update(), StreamState::Subscribed);

        let listener = TcpListener::bind(addr).await.unwrap();
        let _socket = accept(&listener).await;
        timeout(WAIT, state.wait_for(|s| *s == StreamState::Subscribed))
            .await
            .unwrap()
            .unwrap();

        task.abort();
    }
}
