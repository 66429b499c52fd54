//! WebSocket adapter for the ledger's live event feed.
//!
//! Handles the connection lifecycle: establishing the socket, subscribing to
//! the contract's order channel, and mapping push frames into
//! [`LedgerEvent`]s. Parse failures are logged and skipped; close frames and
//! transport errors surface in-band as `Disconnected` so the supervisor can
//! drive reconnection.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{info, trace, warn};

use super::dto::{FeedFrame, SubscribeMessage};
use crate::domain::LedgerEvent;
use crate::error::LedgerError;
use crate::port::LedgerEventStream;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push feed of order events for one escrow contract.
pub struct WsLedgerStream {
    url: String,
    contract: String,
    socket: Option<Socket>,
}

impl WsLedgerStream {
    #[must_use]
    pub fn new(url: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            contract: contract.into(),
            socket: None,
        }
    }
}

#[async_trait]
impl LedgerEventStream for WsLedgerStream {
    async fn connect(&mut self) -> Result<(), LedgerError> {
        info!(url = %self.url, "Connecting to ledger feed");
        let (mut socket, response) = connect_async(&self.url)
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        info!(status = %response.status(), "Ledger feed connected");

        let subscribe = SubscribeMessage::orders(&self.contract);
        let json = serde_json::to_string(&subscribe)
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        socket
            .send(Message::Text(json))
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        self.socket = Some(socket);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<LedgerEvent> {
        loop {
            let message = self.socket.as_mut()?.next().await;
            match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<FeedFrame>(&text) {
                    Ok(frame) => match frame.into_event() {
                        Ok(Some(event)) => return Some(event),
                        Ok(None) => trace!("Ignoring non-event frame"),
                        Err(err) => warn!(error = %err, "Dropping malformed event payload"),
                    },
                    Err(err) => warn!(error = %err, "Unparseable feed frame"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    trace!("Answering feed ping");
                    let pong_failed = match self.socket.as_mut() {
                        Some(socket) => socket.send(Message::Pong(payload)).await.is_err(),
                        None => return None,
                    };
                    if pong_failed {
                        self.socket = None;
                        return Some(LedgerEvent::Disconnected {
                            reason: "pong delivery failed".into(),
                        });
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    self.socket = None;
                    let reason = frame
                        .map(|f| f.reason.into_owned())
                        .unwrap_or_else(|| "server closed the feed".into());
                    return Some(LedgerEvent::Disconnected { reason });
                }
                Some(Ok(_)) => trace!("Ignoring non-text frame"),
                Some(Err(err)) => {
                    self.socket = None;
                    return Some(LedgerEvent::Disconnected {
                        reason: err.to_string(),
                    });
                }
                None => {
                    self.socket = None;
                    return None;
                }
            }
        }
    }

    fn venue(&self) -> &'static str {
        "ledger-ws"
    }
}
