//! Caller-facing order management.
//!
//! [`TradingClient`] validates requests with [`compose`], hands them to an
//! [`ExchangeGateway`](crate::gateway::ExchangeGateway), and maps what comes back with
//! [`normalize`]. Every failure reaches the caller as one classified
//! [`Error`](crate::error::Error) carrying the operation that failed.

mod client;
mod config;
mod policy;
mod types;

pub mod compose;
pub mod normalize;

pub use client::TradingClient;
pub use compose::compose;
pub use config::{Config, RawSigningConfig};
pub use normalize::{Lookup, normalize};
pub use policy::{FixedOrFetch, OrderPolicies, TimePolicy};
pub use types::{
    Order, OrderRequest, PlacedOrder, SignatureTypeInput, TimestampSource, WireOrder,
};
