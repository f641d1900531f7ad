//! Mapping of raw exchange order records into the canonical [`Order`].
//!
//! Numeric fields arrive as text. Anything that does not parse fails the whole record with
//! [`Kind::MalformedResponse`](crate::error::Kind::MalformedResponse); nothing is coerced to zero.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::Result;
use crate::error::Error;
use crate::gateway::RawOrder;
use crate::trading::types::{Order, TimestampSource};
use crate::types::{Decimal, Side};

/// How the record was obtained. Decides the status reported when the exchange leaves it out.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lookup {
    /// Part of the open-order set, so it is open.
    Listing,
    /// Fetched by id; nothing is known about its state.
    Single,
}

impl Lookup {
    #[must_use]
    pub const fn default_status(self) -> &'static str {
        match self {
            Lookup::Listing => "open",
            Lookup::Single => "unknown",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Text(String),
    Number(serde_json::Number),
}

impl Numeric {
    fn text(&self) -> String {
        match self {
            Numeric::Text(text) => text.trim().to_owned(),
            Numeric::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct OrderRecord {
    id: String,
    asset_id: String,
    side: String,
    price: Numeric,
    size_matched: Numeric,
    original_size: Numeric,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<Numeric>,
}

/// Normalizes `raw`, stamping records without a creation time with the current time.
pub fn normalize(raw: RawOrder, lookup: Lookup) -> Result<Order> {
    normalize_at(raw, lookup, Utc::now())
}

/// As [`normalize`], with the fallback timestamp supplied by the caller.
pub fn normalize_at(raw: RawOrder, lookup: Lookup, now: DateTime<Utc>) -> Result<Order> {
    let record = OrderRecord::deserialize(&raw)
        .map_err(|e| Error::malformed(format!("unreadable order record: {e}")))?;

    let price = parse_decimal("price", &record.price)?;
    let original_size = parse_decimal("original_size", &record.original_size)?;
    let matched = parse_decimal("size_matched", &record.size_matched)?;

    if original_size.is_sign_negative() || matched.is_sign_negative() {
        return Err(Error::malformed(format!(
            "order {} has negative sizes: original {original_size}, matched {matched}",
            record.id
        )));
    }
    if matched > original_size {
        return Err(Error::malformed(format!(
            "order {} matched {matched} exceeds original size {original_size}",
            record.id
        )));
    }

    let side = match record.side.to_ascii_uppercase().as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => {
            return Err(Error::malformed(format!(
                "order {} has unknown side `{other}`",
                record.id
            )));
        }
    };

    let status = record
        .status
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| lookup.default_status().to_owned());

    let (timestamp, timestamp_source) = match &record.created_at {
        Some(created_at) => (parse_timestamp(created_at)?, TimestampSource::Exchange),
        None => (now, TimestampSource::Observed),
    };

    Ok(Order {
        order_id: record.id,
        token_id: record.asset_id,
        side,
        price,
        original_size,
        size: original_size - matched,
        status,
        timestamp,
        timestamp_source,
        raw,
    })
}

fn parse_decimal(field: &str, value: &Numeric) -> Result<Decimal> {
    let text = value.text();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| Error::malformed(format!("{field} `{text}` is not a number: {e}")))
}

fn parse_timestamp(value: &Numeric) -> Result<DateTime<Utc>> {
    let text = value.text();
    text.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| Error::malformed(format!("created_at `{text}` is not a unix timestamp")))
}
