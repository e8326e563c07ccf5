//! Relay session types

use async_trait::async_trait;
use thiserror::Error;

/// Close code sent to the client when a relay session fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// Malformed upstream message; the session cannot continue
    InternalError,
    /// Upstream bus failure; the client may reconnect later
    TryAgainLater,
}

impl CloseCode {
    /// Numeric WebSocket close code
    pub fn as_u16(self) -> u16 {
        match self {
            CloseCode::InternalError => 1011,
            CloseCode::TryAgainLater => 1013,
        }
    }
}

/// How a relay session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    /// Client disconnected; the only clean terminal state
    ClientGone,
    /// Session failed and the connection was closed with the given code
    Closed(CloseCode),
}

/// Client transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("client disconnected")]
    ClientGone,
    #[error("transport failure: {0}")]
    Io(String),
}

/// Message-oriented bidirectional link to one connected client
///
/// The relay state machine is written against this trait only; the WebSocket
/// adapter lives in the server module and tests substitute channel-backed
/// fakes.
#[async_trait]
pub trait ClientTransport: Send {
    /// Next text message from the client. `Ok(None)` once the client is gone.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Send a text payload to the client
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection with a distinguishing close code
    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError>;
}
