//! WebSocket endpoint for live price subscriptions
//!
//! Accepts connections, upgrades them, and hands each one to its own relay
//! task. The tungstenite stream is adapted to the relay's transport trait so
//! the state machine stays transport-agnostic.

use crate::bus::Subscriber;
use crate::relay::{ClientTransport, CloseCode, Relay, TransportError};
use crate::store::PriceStore;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Live-update WebSocket server
pub struct Server {
    bind: String,
    store: PriceStore,
    subscriber: Arc<dyn Subscriber>,
    poll_interval: Duration,
    history_rows: u32,
}

impl Server {
    pub fn new(
        bind: impl Into<String>,
        store: PriceStore,
        subscriber: Arc<dyn Subscriber>,
        poll_interval: Duration,
        history_rows: u32,
    ) -> Self {
        Self {
            bind: bind.into(),
            store,
            subscriber,
            poll_interval,
            history_rows,
        }
    }

    /// Accept and serve subscriber connections until the process stops
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.bind).await?;
        tracing::info!(addr = %self.bind, "listening for price subscribers");

        loop {
            let (stream, peer) = listener.accept().await?;
            let store = self.store.clone();
            let subscriber = self.subscriber.clone();
            let poll_interval = self.poll_interval;
            let history_rows = self.history_rows;

            tokio::spawn(async move {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => {
                        let relay = Relay::new(WsTransport::new(ws), subscriber, store)
                            .poll_interval(poll_interval)
                            .history_rows(history_rows);
                        let exit = relay.run().await;
                        tracing::info!(%peer, ?exit, "relay session ended");
                    }
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "websocket handshake failed");
                    }
                }
            });
        }
    }
}

/// Relay transport over an accepted tungstenite stream
pub struct WsTransport {
    ws: WebSocketStream<TcpStream>,
}

impl WsTransport {
    pub fn new(ws: WebSocketStream<TcpStream>) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl ClientTransport for WsTransport {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.ws.next().await {
                None => return Ok(None),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(data))) => {
                    self.ws
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| TransportError::Io(e.to_string()))?;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code.as_u16()),
            reason: "".into(),
        };
        self.ws
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}
