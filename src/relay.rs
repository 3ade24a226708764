//! Downstream relay connection.
//!
//! [`RelayClient`] keeps a WebSocket to the relay consumer open, reconnecting
//! after a fixed delay whenever it drops. [`RelayHandle`] is the dispatcher's
//! side: it refuses delivery while the connection is down rather than
//! buffering, so a notification drained during an outage is lost.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use printwatch_types::RelayPayload;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{RelayError, TransportError};
use crate::notify::{NotificationSink, PendingNotification};
use crate::source::RECONNECT_DELAY;

/// Encoded payloads waiting for the connection task.
const OUTBOUND_CAPACITY: usize = 16;

/// Connection task for the relay consumer.
pub struct RelayClient {
    url: String,
    reconnect_delay: Duration,
    connected: watch::Sender<bool>,
    outbound: mpsc::Receiver<String>,
}

impl RelayClient {
    /// Create the client and the handle used to send through it.
    pub fn new(url: impl Into<String>, credential: impl Into<String>) -> (Self, RelayHandle) {
        let (sender, outbound) = mpsc::channel(OUTBOUND_CAPACITY);
        let (connected, connected_rx) = watch::channel(false);

        let client = Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
            connected,
            outbound,
        };
        let handle = RelayHandle {
            credential: credential.into(),
            connected: connected_rx,
            sender,
        };
        (client, handle)
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Keep the connection up until every [`RelayHandle`] is dropped.
    pub async fn run(mut self) {
        loop {
            match self.session().await {
                Ok(true) => {
                    info!("All relay handles dropped, relay client stopping");
                    return;
                }
                Ok(false) => info!("Relay connection closed"),
                Err(e) => warn!("Relay connection failed: {}", e),
            }
            self.connected.send_replace(false);

            info!(
                "Reconnecting to relay in {}s",
                self.reconnect_delay.as_secs_f32()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One connection lifetime. Returns `Ok(true)` once there is nothing
    /// left that could send.
    async fn session(&mut self) -> Result<bool, TransportError> {
        let (socket, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = socket.split();

        // Anything queued for a previous connection is stale
        while self.outbound.try_recv().is_ok() {}
        self.connected.send_replace(true);
        info!("Connected to relay at {}", self.url);

        loop {
            tokio::select! {
                payload = self.outbound.recv() => {
                    let Some(payload) = payload else {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(true);
                    };
                    write.send(Message::Text(payload)).await?;
                }
                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => info!("Message from relay: {}", text),
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Relay close frame: {:?}", frame);
                            return Ok(false);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(false),
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("url", &self.url)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("connected", &*self.connected.borrow())
            .finish()
    }
}

/// Sending side of the relay connection.
#[derive(Clone)]
pub struct RelayHandle {
    credential: String,
    connected: watch::Receiver<bool>,
    sender: mpsc::Sender<String>,
}

impl RelayHandle {
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Wait up to `limit` for the connection to come up.
    ///
    /// Returns whether it is up.
    pub async fn wait_connected(&self, limit: Duration) -> bool {
        let mut connected = self.connected.clone();
        tokio::time::timeout(limit, connected.wait_for(|up| *up))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for RelayHandle {
    async fn deliver(&self, notification: &PendingNotification) -> Result<(), RelayError> {
        if !self.is_connected() {
            return Err(RelayError::NotConnected);
        }

        let payload = RelayPayload::process_text(self.credential.as_str(), notification.text());
        let encoded = serde_json::to_string(&payload)?;
        self.sender
            .send(encoded)
            .await
            .map_err(|_| RelayError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::{accept_async, WebSocketStream};

    const WAIT: Duration = Duration::from_secs(5);

    async fn accept(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
        let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        accept_async(tcp).await.unwrap()
    }

    async fn wait_disconnected(handle: &RelayHandle) {
        let mut connected = handle.connected.clone();
        timeout(WAIT, connected.wait_for(|up| !*up))
            .await
            .unwrap()
            .unwrap();
    }

    async fn next_text(socket: &mut WebSocketStream<tokio::net::TcpStream>) -> serde_json::Value {
        let Some(Ok(Message::Text(text))) = timeout(WAIT, socket.next()).await.unwrap() else {
            panic!("expected a text frame");
        };
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_not_connected_refuses_delivery() {
        let (_client, handle) = RelayClient::new("ws://127.0.0.1:9/ws", "secret");
        let result = handle
            .deliver(&PendingNotification::new("The printer is ready."))
            .await;
        assert!(matches!(result, Err(RelayError::NotConnected)));
    }

    #[tokio::test]
    async fn test_delivers_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (client, handle) = RelayClient::new(url, "secret");
        let task = client.spawn();

        let mut socket = accept(&listener).await;
        assert!(handle.wait_connected(WAIT).await);

        // Inbound traffic is only logged
        socket
            .send(Message::Text("{\"status\": \"ok\"}".to_string()))
            .await
            .unwrap();

        handle
            .deliver(&PendingNotification::new("The print has been paused."))
            .await
            .unwrap();

        let payload = next_text(&mut socket).await;
        assert_eq!(payload["API_KEY"], "secret");
        assert_eq!(payload["action"], "process_text");
        assert_eq!(payload["text"], "Notify:The print has been paused.");

        task.abort();
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let (client, handle) = RelayClient::new(url, "secret");
        let task = client
            .with_reconnect_delay(Duration::from_millis(20))
            .spawn();

        let mut first = accept(&listener).await;
        assert!(handle.wait_connected(WAIT).await);
        first.close(None).await.unwrap();
        wait_disconnected(&handle).await;

        let mut second = accept(&listener).await;
        assert!(handle.wait_connected(WAIT).await);
        handle
            .deliver(&PendingNotification::new("Cooling the bed"))
            .await
            .unwrap();
        assert_eq!(next_text(&mut second).await["text"], "Notify:Cooling the bed");

        task.abort();
    }
}
