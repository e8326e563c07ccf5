//! Per-client subscription relay
//!
//! Bridges one channel subscription to one connected client. The session
//! awaits an initial message naming the ticker to track, optionally answers a
//! gap-fill page from the store, then forwards validated price updates from
//! the ticker's channel until the client disconnects or the channel fails.
//!
//! Failure handling is local to the session: a malformed bus message closes
//! the client with `internal-error`, a bus read failure with
//! `try-again-later`. Client disconnect at any point is the clean exit.

mod types;

pub use types::{ClientTransport, CloseCode, RelayExit, TransportError};

use crate::bus::{Decoded, Envelope, PriceUpdate, Subscriber};
use crate::store::{PriceStore, DEFAULT_HISTORY_ROWS};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Bounded wait on each subscription poll, keeping the session responsive to
/// cancellation without busy-looping
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Initial client message: either a plain ticker name, or a JSON array
/// `[name, older_than_or_null]` that also requests a gap-fill page of points
/// newer than `older_than` before live updates begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub name: String,
    pub gap_fill: bool,
    pub older_than: Option<DateTime<Utc>>,
}

impl TrackRequest {
    pub fn parse(text: &str) -> Self {
        if let Ok((name, older_than)) =
            serde_json::from_str::<(String, Option<DateTime<Utc>>)>(text)
        {
            return Self {
                name,
                gap_fill: true,
                older_than,
            };
        }
        Self {
            name: text.trim().to_string(),
            gap_fill: false,
            older_than: None,
        }
    }
}

/// One relay session over a client transport
pub struct Relay<T: ClientTransport> {
    transport: T,
    subscriber: Arc<dyn Subscriber>,
    store: PriceStore,
    poll_interval: Duration,
    history_rows: u32,
}

impl<T: ClientTransport> Relay<T> {
    pub fn new(transport: T, subscriber: Arc<dyn Subscriber>, store: PriceStore) -> Self {
        Self {
            transport,
            subscriber,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_rows: DEFAULT_HISTORY_ROWS,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn history_rows(mut self, rows: u32) -> Self {
        self.history_rows = rows;
        self
    }

    /// Drive the session to its terminal state
    pub async fn run(mut self) -> RelayExit {
        let initial = match self.transport.recv().await {
            Ok(Some(text)) => text,
            Ok(None) | Err(_) => return RelayExit::ClientGone,
        };
        let request = TrackRequest::parse(&initial);
        tracing::debug!(ticker = %request.name, gap_fill = request.gap_fill, "relay session started");

        if request.gap_fill {
            if let Some(exit) = self.send_gap_fill(&request).await {
                return exit;
            }
        }

        let mut subscription = match self.subscriber.subscribe(&request.name).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(ticker = %request.name, error = %e, "failed to subscribe");
                return self.fail(CloseCode::TryAgainLater).await;
            }
        };

        loop {
            tokio::select! {
                message = subscription.next(self.poll_interval) => match message {
                    Ok(None) => continue,
                    Ok(Some(raw)) => match Envelope::decode(&raw) {
                        Ok(Decoded::Control(kind)) => {
                            tracing::debug!(ticker = %request.name, kind = %kind, "skipping control message");
                        }
                        Ok(Decoded::Update(update)) => {
                            if let Some(exit) = self.forward(&update).await {
                                return exit;
                            }
                        }
                        Err(e) => {
                            tracing::error!(ticker = %request.name, error = %e, "malformed message from bus");
                            return self.fail(CloseCode::InternalError).await;
                        }
                    },
                    Err(e) => {
                        tracing::error!(ticker = %request.name, error = %e, "bus read failed");
                        return self.fail(CloseCode::TryAgainLater).await;
                    }
                },
                incoming = self.transport.recv() => match incoming {
                    // Clients may resend the ticker name as a keepalive; ignore it
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => return RelayExit::ClientGone,
                },
            }
        }
    }

    /// Answer the gap-fill page, if any. When no points are newer than the
    /// requested timestamp, nothing is sent. Returns the terminal exit if the
    /// session cannot continue.
    async fn send_gap_fill(&mut self, request: &TrackRequest) -> Option<RelayExit> {
        let points = match self
            .store
            .history_since(&request.name, request.older_than, self.history_rows)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                tracing::error!(ticker = %request.name, error = %e, "gap-fill query failed");
                return Some(self.fail(CloseCode::InternalError).await);
            }
        };
        if points.is_empty() {
            return None;
        }
        let updates: Vec<PriceUpdate> = points
            .into_iter()
            .map(|point| PriceUpdate {
                name: request.name.clone(),
                price: point.price,
                created_at: point.created_at,
            })
            .collect();
        match serde_json::to_string(&updates) {
            Ok(payload) => match self.transport.send(payload).await {
                Ok(()) => None,
                Err(_) => Some(RelayExit::ClientGone),
            },
            Err(e) => {
                tracing::error!(ticker = %request.name, error = %e, "failed to encode gap-fill page");
                Some(self.fail(CloseCode::InternalError).await)
            }
        }
    }

    /// Forward one decoded update; returns the terminal exit if the client is
    /// gone or the payload cannot be encoded.
    async fn forward(&mut self, update: &PriceUpdate) -> Option<RelayExit> {
        let payload = match serde_json::to_string(update) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(ticker = %update.name, error = %e, "failed to encode update");
                return Some(self.fail(CloseCode::InternalError).await);
            }
        };
        match self.transport.send(payload).await {
            Ok(()) => None,
            Err(_) => Some(RelayExit::ClientGone),
        }
    }

    async fn fail(&mut self, code: CloseCode) -> RelayExit {
        let _ = self.transport.close(code).await;
        RelayExit::Closed(code)
    }
}
