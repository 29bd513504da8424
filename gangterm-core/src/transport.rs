//! Transport binding for the Head Honcho WebSocket
//!
//! The session controller talks to the network through the [`Transport`]
//! trait. [`WsTransport`] is the production implementation: each connection
//! runs as one background task on a tokio runtime, outbound frames go through
//! an unbounded channel (so `send` never blocks the UI thread), and everything
//! the connection observes is reported back as `(ConnectionId, TransportEvent)`
//! pairs in arrival order.
//!
//! Every connection task ends by emitting exactly one [`TransportEvent::Closed`].

use std::fmt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::validate_ws_url;
use crate::error::{Error, Result};

/// Identifies one connection attempt. A new id is allocated for every
/// connect, so events from an earlier connection can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn first() -> Self {
        ConnectionId(1)
    }

    pub fn next(self) -> Self {
        ConnectionId(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something the transport observed on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed
    Opened,
    /// One inbound text frame, verbatim
    Message(String),
    /// Connect failure or I/O error; a `Closed` follows
    Error(String),
    /// The connection is gone
    Closed,
}

/// Duplex, message-oriented link to one remote endpoint.
///
/// Implementations deliver [`TransportEvent`]s asynchronously through their
/// own channel; none of these calls wait for the network.
pub trait Transport {
    /// Start connecting to `url`. Replaces any previous link.
    fn open(&mut self, id: ConnectionId, url: &str) -> Result<()>;

    /// Queue one text frame on the connection `id`.
    fn send(&mut self, id: ConnectionId, text: String) -> Result<()>;

    /// Ask the connection `id` to shut down. `Closed` is reported later.
    fn close(&mut self, id: ConnectionId);
}

/// Receiving half of a [`WsTransport`]'s event stream
pub type TransportEvents = mpsc::UnboundedReceiver<(ConnectionId, TransportEvent)>;

type EventSender = mpsc::UnboundedSender<(ConnectionId, TransportEvent)>;

enum Command {
    Send(String),
    Close,
}

struct Link {
    id: ConnectionId,
    commands: mpsc::UnboundedSender<Command>,
}

/// WebSocket transport backed by `tokio-tungstenite`
pub struct WsTransport {
    runtime: Handle,
    connect_timeout: Duration,
    events: EventSender,
    link: Option<Link>,
}

impl WsTransport {
    /// Create a transport that spawns its connection tasks on `runtime`.
    ///
    /// Returns the transport and the receiver its events are delivered on.
    pub fn new(runtime: Handle, connect_timeout: Duration) -> (Self, TransportEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            runtime,
            connect_timeout,
            events,
            link: None,
        };
        (transport, receiver)
    }

    fn link_for(&self, id: ConnectionId) -> Option<&Link> {
        self.link.as_ref().filter(|link| link.id == id)
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, url: &str) -> Result<()> {
        let url = validate_ws_url(url)?;

        // Dropping the previous command sender ends that task.
        let (commands, receiver) = mpsc::unbounded_channel();
        self.link = Some(Link { id, commands });

        self.runtime.spawn(run_connection(
            id,
            url,
            self.connect_timeout,
            receiver,
            self.events.clone(),
        ));
        Ok(())
    }

    fn send(&mut self, id: ConnectionId, text: String) -> Result<()> {
        let link = self.link_for(id).ok_or(Error::NotConnected)?;
        link.commands
            .send(Command::Send(text))
            .map_err(|_| Error::Transport(format!("connection {} has already exited", id)))
    }

    fn close(&mut self, id: ConnectionId) {
        if let Some(link) = self.link_for(id) {
            if link.commands.send(Command::Close).is_err() {
                debug!(connection = %id, "close requested for a finished connection");
            }
        }
    }
}

/// Body of one connection task.
async fn run_connection(
    id: ConnectionId,
    url: Url,
    connect_timeout: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: EventSender,
) {
    let emit = |event: TransportEvent| {
        // The receiver only goes away when the whole app is shutting down.
        let _ = events.send((id, event));
    };

    let connect = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));
    tokio::pin!(connect);

    let stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok(Ok((stream, _response))) => break stream,
                Ok(Err(error)) => {
                    warn!(connection = %id, url = %url, error = %error, "WebSocket connect failed");
                    emit(TransportEvent::Error(error.to_string()));
                    emit(TransportEvent::Closed);
                    return;
                }
                Err(_) => {
                    warn!(connection = %id, url = %url, "WebSocket connect timed out");
                    emit(TransportEvent::Error(format!(
                        "connection timeout after {:?}",
                        connect_timeout
                    )));
                    emit(TransportEvent::Closed);
                    return;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(_)) => {
                    debug!(connection = %id, "dropping frame queued before the handshake");
                }
                Some(Command::Close) | None => {
                    info!(connection = %id, "connect cancelled");
                    emit(TransportEvent::Closed);
                    return;
                }
            },
        }
    };

    info!(connection = %id, url = %url, "WebSocket connected");
    emit(TransportEvent::Opened);

    let (mut writer, mut reader) = stream.split();

    loop {
        tokio::select! {
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Message(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(connection = %id, ?frame, "peer closed the connection");
                    break;
                }
                Some(Ok(Message::Binary(payload))) => {
                    debug!(connection = %id, bytes = payload.len(), "ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(connection = %id, error = %error, "WebSocket read failed");
                    emit(TransportEvent::Error(error.to_string()));
                    break;
                }
                None => break,
            },
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    if let Err(error) = writer.send(Message::Text(text)).await {
                        warn!(connection = %id, error = %error, "WebSocket write failed");
                        emit(TransportEvent::Error(error.to_string()));
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    if let Err(error) = writer.close().await {
                        debug!(connection = %id, error = %error, "close handshake failed");
                    }
                    break;
                }
            },
        }
    }

    info!(connection = %id, "WebSocket connection finished");
    emit(TransportEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_monotonic() {
        let first = ConnectionId::first();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.get(), 2);
        assert_eq!(first.to_string(), "#1");
    }

    #[tokio::test]
    async fn test_send_without_link_is_rejected() {
        let (mut transport, _events) =
            WsTransport::new(Handle::current(), Duration::from_secs(1));
        let result = transport.send(ConnectionId::first(), "{}".to_string());
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_open_rejects_non_websocket_url() {
        let (mut transport, _events) =
            WsTransport::new(Handle::current(), Duration::from_secs(1));
        let result = transport.open(ConnectionId::first(), "http://localhost:1");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_close_before_handshake_reports_closed() {
        // Reserve a port and keep it open but never accept, so the handshake hangs.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (mut transport, mut events) =
            WsTransport::new(Handle::current(), Duration::from_secs(30));
        let id = ConnectionId::first();
        transport.open(id, &format!("ws://{}", addr)).unwrap();
        transport.close(id);

        let (event_id, event) = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event_id, id);
        assert_eq!(event, TransportEvent::Closed);
        drop(listener);
    }
}
