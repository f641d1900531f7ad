use crate::types::TickSize;

/// A per-market parameter that is either pinned by the caller or fetched from the exchange.
///
/// Fetched values are cached per token for the lifetime of the gateway.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixedOrFetch<T> {
    Fixed(T),
    Fetch,
}

impl<T> Default for FixedOrFetch<T> {
    fn default() -> Self {
        FixedOrFetch::Fetch
    }
}

impl<T: Copy> FixedOrFetch<T> {
    #[must_use]
    pub fn fixed(self) -> Option<T> {
        match self {
            FixedOrFetch::Fixed(value) => Some(value),
            FixedOrFetch::Fetch => None,
        }
    }
}

/// Clock used for auth header timestamps.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TimePolicy {
    /// Local unix clock, no extra request.
    #[default]
    Local,
    /// Ask the exchange (`GET /time`) before every signed request.
    Server,
}

/// Market parameters the HTTP gateway needs to sign orders.
#[derive(Clone, Copy, Debug, Default, bon::Builder)]
pub struct OrderPolicies {
    #[builder(default)]
    pub tick_size: FixedOrFetch<TickSize>,
    #[builder(default)]
    pub neg_risk: FixedOrFetch<bool>,
    #[builder(default)]
    pub fee_rate_bps: FixedOrFetch<u32>,
    #[builder(default)]
    pub time: TimePolicy,
}
