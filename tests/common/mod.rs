//! Shared test helpers

use async_trait::async_trait;
use tickertape::relay::{ClientTransport, CloseCode, TransportError};
use tokio::sync::mpsc;

/// What the fake client observed from the relay
#[derive(Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Text(String),
    Closed(CloseCode),
}

/// Channel-backed client transport for driving a relay without a socket
pub struct ChannelTransport {
    incoming: mpsc::Receiver<String>,
    outgoing: mpsc::Sender<ClientEvent>,
}

/// Returns the transport plus the client-side handles: a sender for messages
/// to the relay (dropping it is a disconnect) and a receiver for everything
/// the relay sends back.
pub fn transport_pair() -> (
    ChannelTransport,
    mpsc::Sender<String>,
    mpsc::Receiver<ClientEvent>,
) {
    let (in_tx, in_rx) = mpsc::channel(16);
    let (out_tx, out_rx) = mpsc::channel(16);
    (
        ChannelTransport {
            incoming: in_rx,
            outgoing: out_tx,
        },
        in_tx,
        out_rx,
    )
}

#[async_trait]
impl ClientTransport for ChannelTransport {
    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.incoming.recv().await)
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outgoing
            .send(ClientEvent::Text(text))
            .await
            .map_err(|_| TransportError::ClientGone)
    }

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError> {
        self.outgoing
            .send(ClientEvent::Closed(code))
            .await
            .map_err(|_| TransportError::ClientGone)
    }
}
