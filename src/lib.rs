//! Order lifecycle client for Polymarket-style CLOB exchanges.
//!
//! The crate is split along the order flow:
//! - [`auth`] picks the signing mode (custodial key vs. external signer) and builder attribution
//! - [`trading`] validates caller requests, normalizes exchange records, and exposes
//!   [`trading::TradingClient`]
//! - [`gateway`] talks to the exchange; [`gateway::HttpGateway`] is the REST implementation

pub mod auth;
pub mod error;
pub mod gateway;
pub mod trading;
pub mod types;

use alloy::primitives::address;
use phf::phf_map;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Request, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::types::{Address, ChainId};

pub type Result<T> = std::result::Result<T, Error>;

/// Unix seconds.
pub type Timestamp = i64;

pub const POLYGON: ChainId = 137;
pub const AMOY: ChainId = 80002;

/// Exchange contracts orders are signed against.
#[non_exhaustive]
#[derive(Clone, Copy, Debug)]
pub struct ContractConfig {
    pub exchange: Address,
}

static CONFIG: phf::Map<u64, ContractConfig> = phf_map! {
    137_u64 => ContractConfig {
        exchange: address!("0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E"),
    },
    80002_u64 => ContractConfig {
        exchange: address!("0xdFE02Eb6733538f8Ea35D585af8DE5958AD99E40"),
    },
};

static NEG_RISK_CONFIG: phf::Map<u64, ContractConfig> = phf_map! {
    137_u64 => ContractConfig {
        exchange: address!("0xC5d563A36AE78145C45a50134d48A1215220f80a"),
    },
    80002_u64 => ContractConfig {
        exchange: address!("0xC5d563A36AE78145C45a50134d48A1215220f80a"),
    },
};

#[must_use]
pub fn contract_config(chain_id: ChainId, neg_risk: bool) -> Option<&'static ContractConfig> {
    if neg_risk {
        NEG_RISK_CONFIG.get(&chain_id)
    } else {
        CONFIG.get(&chain_id)
    }
}

async fn send(
    client: &ReqwestClient,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Response> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(headers) = headers {
        request.headers_mut().extend(headers);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(%method, %path, "sending exchange request");

    let response = client.execute(request).await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = rejection_message(response.text().await);

    #[cfg(feature = "tracing")]
    tracing::warn!(%method, %path, %status, %message, "exchange rejected request");

    Err(Error::rejection(status, method, path, message))
}

fn rejection_message(body: reqwest::Result<String>) -> String {
    match body {
        Ok(body) => body,
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %e, "failed to read rejection body");

            format!("<unreadable body: {e}>")
        }
    }
}

pub(crate) async fn request<R: DeserializeOwned>(
    client: &ReqwestClient,
    request: Request,
    headers: Option<HeaderMap>,
) -> Result<R> {
    let response = send(client, request, headers).await?;
    let bytes = response.bytes().await?;
    decode(&bytes)
}

/// Like [`request`], but treats `404` and an empty or `null` body as absent.
pub(crate) async fn request_optional<R: DeserializeOwned>(
    client: &ReqwestClient,
    request: Request,
    headers: Option<HeaderMap>,
) -> Result<Option<R>> {
    let response = match send(client, request, headers).await {
        Ok(response) => response,
        Err(e)
            if e.downcast_ref::<error::Rejection>()
                .is_some_and(|r| r.status_code == StatusCode::NOT_FOUND) =>
        {
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let bytes = response.bytes().await?;
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() || trimmed == b"null" || trimmed == b"{}" {
        return Ok(None);
    }
    decode(trimmed).map(Some)
}

#[cfg(feature = "tracing")]
fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let mut on_ignored = |path: serde_ignored::Path<'_>| {
        tracing::debug!(%path, "ignored field in exchange response");
    };
    let value = serde_path_to_error::deserialize(serde_ignored::Deserializer::new(
        &mut de,
        &mut on_ignored,
    ))?;
    de.end()?;
    Ok(value)
}

#[cfg(not(feature = "tracing"))]
fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    Ok(serde_json::from_slice(bytes)?)
}
