//! Wire envelope carried on the broadcast bus
//!
//! Every bus message is a JSON envelope with a `kind` discriminator. Only the
//! `"message"` kind carries a price update, nested as a JSON string in `data`;
//! every other kind is control traffic (subscription confirmations and the
//! like) and carries nothing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope kind that carries a price update payload
pub const DATA_KIND: &str = "message";

/// Envelope kind sent when a subscription becomes active
pub const SUBSCRIBE_KIND: &str = "subscribe";

/// Decoded payload of a data envelope: one new price for one ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The raw envelope as serialized on a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Envelope decode failures, all fatal to the session that hit them
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("data envelope without a payload")]
    MissingPayload,
    #[error("malformed price update payload: {0}")]
    BadPayload(#[source] serde_json::Error),
}

/// Outcome of decoding a raw bus message
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A validated price update, ready to forward
    Update(PriceUpdate),
    /// Control traffic of the named kind, to be skipped
    Control(String),
}

impl Envelope {
    /// Wrap a price update in a data envelope
    pub fn data(update: &PriceUpdate) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: DATA_KIND.to_string(),
            data: Some(serde_json::to_string(update)?),
        })
    }

    /// Build a control envelope of the given kind
    pub fn control(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            data: None,
        }
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse and validate a raw bus message
    ///
    /// Wrong-kind messages decode to [`Decoded::Control`]; a data envelope
    /// whose payload is missing or malformed is an error, never silently
    /// coerced.
    pub fn decode(raw: &str) -> Result<Decoded, EnvelopeError> {
        let envelope: Envelope = serde_json::from_str(raw).map_err(EnvelopeError::Malformed)?;
        if envelope.kind != DATA_KIND {
            return Ok(Decoded::Control(envelope.kind));
        }
        let data = envelope.data.ok_or(EnvelopeError::MissingPayload)?;
        let update: PriceUpdate =
            serde_json::from_str(&data).map_err(EnvelopeError::BadPayload)?;
        Ok(Decoded::Update(update))
    }
}
