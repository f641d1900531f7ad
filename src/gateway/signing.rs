use std::borrow::Cow;

use alloy::dyn_abi::Eip712Domain;
use alloy::primitives::hex;
use alloy::sol;
use alloy::sol_types::SolStruct as _;
use rand::Rng as _;
use rust_decimal::prelude::ToPrimitive as _;
use serde::Serialize;
use strum_macros::Display;

use crate::Result;
use crate::auth::WalletSigner;
use crate::contract_config;
use crate::error::Error;
use crate::trading::WireOrder;
use crate::types::{Address, ChainId, Decimal, Side, Signature, SignatureType, TickSize, U256};

const ORDER_NAME: Option<Cow<'static, str>> = Some(Cow::Borrowed("Polymarket CTF Exchange"));
const VERSION: Option<Cow<'static, str>> = Some(Cow::Borrowed("1"));

const USDC_DECIMALS: u32 = 6;
const LOT_SIZE_SCALE: u32 = 2;

sol! {
    #[derive(Debug)]
    struct Order {
        uint256 salt;
        address maker;
        address signer;
        address taker;
        uint256 tokenId;
        uint256 makerAmount;
        uint256 takerAmount;
        uint256 expiration;
        uint256 nonce;
        uint256 feeRateBps;
        uint8 side;
        uint8 signatureType;
    }
}

/// Time in force sent with a signed order.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum OrderType {
    /// Good till cancelled.
    GTC,
    /// Good till date; used whenever the order carries an expiration.
    GTD,
}

/// Per-order signing inputs that do not come from the caller's request.
#[derive(Clone, Copy, Debug)]
pub struct SigningContext {
    pub chain_id: ChainId,
    /// Wallet address that produces the signature.
    pub signer: Address,
    /// Address that holds the funds; the signer itself for EOA wallets.
    pub maker: Address,
    pub signature_type: SignatureType,
    pub tick_size: TickSize,
    pub neg_risk: bool,
    pub fee_rate_bps: u32,
}

/// EIP-712 signed order, ready to be posted once the API key owner is known.
#[derive(Debug)]
pub struct SignedOrder {
    order: Order,
    side: Side,
    signature: Signature,
    order_type: OrderType,
}

impl SignedOrder {
    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn maker_amount(&self) -> U256 {
        self.order.makerAmount
    }

    #[must_use]
    pub fn taker_amount(&self) -> U256 {
        self.order.takerAmount
    }

    /// Request body for `POST /order`.
    pub(crate) fn payload<'order>(&'order self, owner: &'order str) -> OrderPayload<'order> {
        let order = &self.order;
        OrderPayload {
            order: OrderBody {
                salt: order.salt.to::<u64>(),
                maker: order.maker.to_checksum(None),
                signer: order.signer.to_checksum(None),
                taker: order.taker.to_checksum(None),
                token_id: order.tokenId.to_string(),
                maker_amount: order.makerAmount.to_string(),
                taker_amount: order.takerAmount.to_string(),
                expiration: order.expiration.to_string(),
                nonce: order.nonce.to_string(),
                fee_rate_bps: order.feeRateBps.to_string(),
                side: self.side,
                signature_type: order.signatureType,
                signature: hex::encode_prefixed(self.signature.as_bytes()),
            },
            owner,
            order_type: self.order_type,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderBody {
    salt: u64,
    maker: String,
    signer: String,
    taker: String,
    token_id: String,
    maker_amount: String,
    taker_amount: String,
    expiration: String,
    nonce: String,
    fee_rate_bps: String,
    side: Side,
    signature_type: u8,
    signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderPayload<'order> {
    order: OrderBody,
    owner: &'order str,
    order_type: OrderType,
}

/// Builds the exchange order for `wire` and signs it with `signer`.
///
/// Enforces the market's tick size and the lot size on top of the caller-level validation.
pub async fn sign_order(
    signer: &dyn WalletSigner,
    wire: &WireOrder,
    context: &SigningContext,
) -> Result<SignedOrder> {
    let price = wire.price;
    let size = wire.size;

    if size.scale() > LOT_SIZE_SCALE {
        return Err(Error::validation(format!(
            "Unable to build Order: Size {size} has {} decimal places. Maximum lot size is {LOT_SIZE_SCALE}",
            size.scale()
        )));
    }

    let minimum_tick_size = context.tick_size.as_decimal();
    let decimals = minimum_tick_size.scale();

    if price.normalize().scale() > decimals {
        return Err(Error::validation(format!(
            "Unable to build Order: Price {price} has {} decimal places. Minimum tick size \
            {minimum_tick_size} has {decimals} decimal places. Price decimal places <= minimum tick size decimal places",
            price.normalize().scale(),
        )));
    }
    if price < minimum_tick_size || price > Decimal::ONE - minimum_tick_size {
        return Err(Error::validation(format!(
            "Price {price} is too small or too large for the minimum tick size {minimum_tick_size}"
        )));
    }

    let notional = (size * price).trunc_with_scale(decimals + LOT_SIZE_SCALE);
    let (maker_amount, taker_amount) = match wire.side {
        Side::Buy => (notional, size),
        Side::Sell => (size, notional),
        other => return Err(Error::validation(format!("Invalid side: {other}"))),
    };

    let token_id = U256::from_str_radix(wire.token_id.trim(), 10).map_err(|e| {
        Error::validation(format!(
            "token id {} is not a decimal integer: {e}",
            wire.token_id
        ))
    })?;

    let expiration = match wire.expiration {
        Some(expiration) => expiration.timestamp().to_u64().ok_or(Error::validation(format!(
            "Unable to represent expiration {expiration} as a u64"
        )))?,
        None => 0,
    };
    let order_type = if expiration > 0 {
        OrderType::GTD
    } else {
        OrderType::GTC
    };

    let order = Order {
        salt: U256::from(to_ieee_754_int(rand::rng().random::<u64>())),
        maker: context.maker,
        signer: context.signer,
        taker: Address::ZERO,
        tokenId: token_id,
        makerAmount: U256::from(to_fixed_u128(maker_amount)?),
        takerAmount: U256::from(to_fixed_u128(taker_amount)?),
        expiration: U256::from(expiration),
        nonce: U256::from(wire.nonce.unwrap_or(0)),
        feeRateBps: U256::from(context.fee_rate_bps),
        side: wire.side as u8,
        signatureType: context.signature_type as u8,
    };

    let exchange_contract = contract_config(context.chain_id, context.neg_risk)
        .ok_or(Error::missing_contract_config(
            context.chain_id,
            context.neg_risk,
        ))?
        .exchange;
    let domain = Eip712Domain {
        name: ORDER_NAME,
        version: VERSION,
        chain_id: Some(U256::from(context.chain_id)),
        verifying_contract: Some(exchange_contract),
        ..Eip712Domain::default()
    };
    let signature = signer
        .sign_hash(&order.eip712_signing_hash(&domain))
        .await?;

    Ok(SignedOrder {
        order,
        side: wire.side,
        signature,
        order_type,
    })
}

/// Removes trailing zeros, truncates to 6 decimals, and quantizes as integer.
fn to_fixed_u128(d: Decimal) -> Result<u128> {
    if d.is_sign_negative() {
        return Err(Error::validation(format!("amount cannot be negative: {d}")));
    }

    d.normalize()
        .trunc_with_scale(USDC_DECIMALS)
        .mantissa()
        .to_u128()
        .ok_or(Error::validation(format!(
            "unable to represent amount as u128: {d}"
        )))
}

/// Mask salt to <= 2^53 - 1 because backend parses as IEEE 754.
fn to_ieee_754_int(salt: u64) -> u64 {
    salt & ((1 << 53) - 1)
}
