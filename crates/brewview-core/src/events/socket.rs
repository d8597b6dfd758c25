//! WebSocket connection to the server's event stream.
//!
//! The socket only forwards parsed events over a channel; it never touches
//! console state. Delivery is best effort: when the connection drops, events
//! stop until the next `connect`.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::Event;

/// What a call to [`EventSocket::connect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// No live connection existed; a new one is being opened.
    Opened,
    /// The live connection was sent the current token.
    TokenRefreshed,
}

struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl Connection {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

pub struct EventSocket {
    endpoint: String,
    events_tx: mpsc::UnboundedSender<Event>,
    connection: Option<Connection>,
}

impl EventSocket {
    pub fn new(endpoint: impl Into<String>, events_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            endpoint: endpoint.into(),
            events_tx,
            connection: None,
        }
    }

    /// Socket plus the receiving end of its event channel.
    pub fn channel(endpoint: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(endpoint, tx), rx)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, token: Option<&str>) -> Result<String> {
        let Some(token) = token else {
            return Ok(self.endpoint.clone());
        };
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid event socket endpoint {}", self.endpoint))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().map(Connection::is_live).unwrap_or(false)
    }

    /// Hand the server `token`, opening a connection if none is live.
    ///
    /// Returns immediately; the connection is established in the background.
    /// Must be called from within a Tokio runtime.
    pub fn connect(&mut self, token: Option<&str>) -> ConnectAttempt {
        if let Some(connection) = self.connection.as_ref().filter(|c| c.is_live()) {
            match serde_json::to_string(&Event::update_token(token)) {
                Ok(message) => {
                    if connection.outbound.send(message).is_ok() {
                        debug!("Sent token update on event socket");
                        return ConnectAttempt::TokenRefreshed;
                    }
                    debug!("Event socket closed before token update");
                }
                Err(e) => warn!(error = %e, "Failed to encode token update"),
            }
        }

        self.open(token);
        ConnectAttempt::Opened
    }

    fn open(&mut self, token: Option<&str>) {
        if let Some(old) = self.connection.take() {
            old.task.abort();
        }

        let url = match self.url(token) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Not opening event socket");
                return;
            }
        };
        let events_tx = self.events_tx.clone();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        debug!(endpoint = %self.endpoint, "Opening event socket");
        let task = tokio::spawn(async move {
            if let Err(e) = run_connection(&url, events_tx, outbound_rx).await {
                warn!(error = %format!("{:#}", e), "Event socket connection ended");
            }
        });

        self.connection = Some(Connection {
            outbound: outbound_tx,
            task,
        });
    }

    /// Drop the connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.task.abort();
            info!("Event socket disconnected");
        }
    }
}

impl Drop for EventSocket {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.task.abort();
        }
    }
}

/// Parse one text frame and pass it on. Malformed frames are dropped.
fn forward_frame(text: &str, events_tx: &mpsc::UnboundedSender<Event>) {
    match Event::from_frame(text) {
        Ok(event) => {
            // Receiver gone means the console is shutting down
            let _ = events_tx.send(event);
        }
        Err(e) => warn!(error = %e, "Dropping malformed event frame"),
    }
}

async fn run_connection(
    url: &str,
    events_tx: mpsc::UnboundedSender<Event>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    let (ws_stream, _) = connect_async(url)
        .await
        .context("Failed to connect to event socket")?;
    info!("Event socket connected");

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => forward_frame(text.as_str(), &events_tx),
                Some(Ok(Message::Ping(data))) => {
                    write.send(Message::Pong(data)).await.context("Failed to answer ping")?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Event socket closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Event socket read failed"),
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(text) => {
                    write
                        .send(Message::Text(text.into()))
                        .await
                        .context("Failed to send on event socket")?;
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    Ok(())
}
