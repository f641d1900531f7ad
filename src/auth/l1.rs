//! Wallet-signature (L1) authentication, used to create or derive API credentials.

use std::borrow::Cow;

use alloy::dyn_abi::Eip712Domain;
use alloy::primitives::hex;
use alloy::sol;
use alloy::sol_types::SolStruct as _;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::auth::WalletSigner;
use crate::auth::l2::{POLY_ADDRESS, POLY_SIGNATURE, POLY_TIMESTAMP};
use crate::types::{Address, ChainId, U256};
use crate::{Result, Timestamp};

const POLY_NONCE: &str = "poly_nonce";

const DOMAIN_NAME: Option<Cow<'static, str>> = Some(Cow::Borrowed("ClobAuthDomain"));
const VERSION: Option<Cow<'static, str>> = Some(Cow::Borrowed("1"));
const MESSAGE: &str = "This message attests that I control the given wallet";

sol! {
    struct ClobAuth {
        address address;
        string timestamp;
        uint256 nonce;
        string message;
    }
}

pub(crate) async fn create_headers(
    signer: &dyn WalletSigner,
    address: Address,
    chain_id: ChainId,
    timestamp: Timestamp,
    nonce: Option<u32>,
) -> Result<HeaderMap> {
    let nonce = nonce.unwrap_or(0);
    let auth = ClobAuth {
        address,
        timestamp: timestamp.to_string(),
        nonce: U256::from(nonce),
        message: MESSAGE.to_owned(),
    };
    let domain = Eip712Domain {
        name: DOMAIN_NAME,
        version: VERSION,
        chain_id: Some(U256::from(chain_id)),
        ..Eip712Domain::default()
    };
    let signature = signer.sign_hash(&auth.eip712_signing_hash(&domain)).await?;

    let mut map = HeaderMap::new();
    map.insert(POLY_ADDRESS, HeaderValue::from_str(&address.to_checksum(None))?);
    map.insert(
        POLY_SIGNATURE,
        HeaderValue::from_str(&hex::encode_prefixed(signature.as_bytes()))?,
    );
    map.insert(POLY_TIMESTAMP, HeaderValue::from_str(&timestamp.to_string())?);
    map.insert(POLY_NONCE, HeaderValue::from_str(&nonce.to_string())?);
    Ok(map)
}
