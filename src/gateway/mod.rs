//! Exchange access.
//!
//! [`ExchangeGateway`] is the seam between order management and the exchange. The trading
//! client only depends on this trait; [`HttpGateway`] is the REST implementation and tests
//! substitute their own.

mod http;
mod signing;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_with::{DefaultOnNull, serde_as};

pub use http::HttpGateway;
pub use signing::{OrderType, SignedOrder, SigningContext, sign_order};

use crate::Result;
use crate::trading::WireOrder;

/// Exchange order record exactly as received.
pub type RawOrder = serde_json::Value;

/// Acknowledgement of a submitted order.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SubmitResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(default)]
    pub status: String,
}

impl SubmitResponse {
    #[must_use]
    pub fn new<I: Into<String>, S: Into<String>>(order_id: I, status: S) -> Self {
        Self {
            order_id: order_id.into(),
            status: status.into(),
        }
    }
}

/// Per-order result of a cancel call, as reported by the exchange.
///
/// A batch may partially succeed; nothing here is all-or-nothing.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct CancelOutcome {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub canceled: Vec<String>,
    /// Order id to the exchange's reason.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub not_canceled: HashMap<String, String>,
}

impl CancelOutcome {
    #[must_use]
    pub fn new(canceled: Vec<String>, not_canceled: HashMap<String, String>) -> Self {
        Self {
            canceled,
            not_canceled,
        }
    }

    /// True when the exchange refused none of the requested ids.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.not_canceled.is_empty()
    }
}

/// Authenticated calls against the exchange. Implementations do not retry.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn submit(&self, order: &WireOrder) -> Result<SubmitResponse>;

    async fn cancel_one(&self, order_id: &str) -> Result<CancelOutcome>;

    async fn cancel_many(&self, order_ids: &[String]) -> Result<CancelOutcome>;

    /// Open orders of the authenticated wallet.
    async fn list_open(&self) -> Result<Vec<RawOrder>>;

    /// `Ok(None)` when the exchange has no such order.
    async fn get_one(&self, order_id: &str) -> Result<Option<RawOrder>>;
}
