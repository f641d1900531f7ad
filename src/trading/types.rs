use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::{TimestampSeconds, serde_as};

use crate::Result;
use crate::error::Error;
use crate::types::{Decimal, Side, SignatureType};

/// Signature type parser for config-style string inputs.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureTypeInput {
    Eoa,
    Proxy,
    GnosisSafe,
}

impl SignatureTypeInput {
    pub fn parse(value: &str) -> Result<SignatureTypeInput> {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" | "eoa" => Ok(SignatureTypeInput::Eoa),
            "1" | "proxy" => Ok(SignatureTypeInput::Proxy),
            "2" | "gnosis" | "gnosis_safe" | "gnosissafe" | "safe" => {
                Ok(SignatureTypeInput::GnosisSafe)
            }
            other => Err(Error::configuration(format!(
                "invalid signature_type `{other}`; expected one of: eoa|proxy|gnosis"
            ))),
        }
    }

    #[must_use]
    pub const fn into_signature_type(self) -> SignatureType {
        match self {
            SignatureTypeInput::Eoa => SignatureType::Eoa,
            SignatureTypeInput::Proxy => SignatureType::Proxy,
            SignatureTypeInput::GnosisSafe => SignatureType::GnosisSafe,
        }
    }
}

impl FromStr for SignatureTypeInput {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SignatureTypeInput::parse(s)
    }
}

/// Caller-facing limit order. Validated by [`compose`](crate::trading::compose) before anything
/// is sent.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub token_id: String,
    pub side: Side,
    /// Probability price, strictly between 0 and 1.
    pub price: Decimal,
    pub size: Decimal,
    pub expiration: Option<DateTime<Utc>>,
    pub nonce: Option<u64>,
}

impl OrderRequest {
    #[must_use]
    pub fn new<S: Into<String>>(token_id: S, side: Side, price: Decimal, size: Decimal) -> Self {
        Self {
            token_id: token_id.into(),
            side,
            price,
            size,
            expiration: None,
            nonce: None,
        }
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Validated order in the shape the gateway accepts. Optional fields are omitted from the
/// serialized form when unset, leaving defaults to the gateway.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WireOrder {
    #[serde(rename = "tokenID")]
    pub token_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    #[serde_as(as = "Option<TimestampSeconds<i64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
}

impl WireOrder {
    pub(crate) fn new(request: &OrderRequest) -> Self {
        Self {
            token_id: request.token_id.clone(),
            side: request.side,
            price: request.price,
            size: request.size,
            expiration: request.expiration,
            nonce: request.nonce,
        }
    }
}

/// Result of [`TradingClient::place_order`](crate::trading::TradingClient::place_order).
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlacedOrder {
    pub order_id: String,
    pub status: String,
}

/// Where [`Order::timestamp`] came from.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimestampSource {
    /// The exchange's own creation time.
    Exchange,
    /// The exchange omitted it; this is the time the record was read, not when the order was
    /// created.
    Observed,
}

/// Canonical order as returned to callers. Built fresh from the exchange on every call.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub token_id: String,
    pub side: Side,
    pub price: Decimal,
    pub original_size: Decimal,
    /// Unfilled remainder, `original_size - matched size`.
    pub size: Decimal,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub timestamp_source: TimestampSource,
    /// The exchange record exactly as received.
    pub raw: serde_json::Value,
}
