//! Validation of caller order requests and mapping into [`WireOrder`].

use crate::Result;
use crate::error::Error;
use crate::trading::types::{OrderRequest, WireOrder};
use crate::types::{Decimal, Side};

/// Validates `request` and maps it to the gateway payload. Pure; never touches the network.
///
/// Checks run in a fixed order and the first failure is returned:
/// non-empty token id, side `BUY`/`SELL`, `0 < price < 1`, `size > 0`.
pub fn compose(request: &OrderRequest) -> Result<WireOrder> {
    if request.token_id.trim().is_empty() {
        return Err(Error::validation("token id must not be empty"));
    }

    if !matches!(request.side, Side::Buy | Side::Sell) {
        return Err(Error::validation(format!(
            "invalid side {}; expected BUY or SELL",
            request.side
        )));
    }

    let price = request.price;
    if price <= Decimal::ZERO || price >= Decimal::ONE {
        return Err(Error::validation(format!(
            "price {price} must be strictly between 0 and 1"
        )));
    }

    let size = request.size;
    if size <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "size {size} must be greater than 0"
        )));
    }

    Ok(WireOrder::new(request))
}
