//! API-key (L2) request authentication.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac as _};
use reqwest::Method;
use reqwest::Request;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret as _, SecretString};
use sha2::Sha256;

use crate::auth::Credentials;
use crate::error::Error;
use crate::types::Address;
use crate::{Result, Timestamp};

pub(crate) const POLY_ADDRESS: &str = "poly_address";
pub(crate) const POLY_SIGNATURE: &str = "poly_signature";
pub(crate) const POLY_TIMESTAMP: &str = "poly_timestamp";
const POLY_API_KEY: &str = "poly_api_key";
const POLY_PASSPHRASE: &str = "poly_passphrase";

pub(crate) fn create_headers(
    address: Address,
    credentials: &Credentials,
    request: &Request,
    timestamp: Timestamp,
) -> Result<HeaderMap> {
    let body = body_text(request);
    let signature = hmac_signature(
        credentials.secret(),
        timestamp,
        request.method(),
        request.url().path(),
        &body,
    )?;

    let mut map = HeaderMap::new();
    map.insert(POLY_ADDRESS, HeaderValue::from_str(&address.to_checksum(None))?);
    map.insert(POLY_SIGNATURE, HeaderValue::from_str(&signature)?);
    map.insert(POLY_TIMESTAMP, HeaderValue::from_str(&timestamp.to_string())?);
    map.insert(POLY_API_KEY, HeaderValue::from_str(credentials.key())?);
    map.insert(
        POLY_PASSPHRASE,
        HeaderValue::from_str(credentials.passphrase().expose_secret())?,
    );
    Ok(map)
}

/// URL-safe base64 HMAC-SHA256 of `timestamp + method + path + body`, keyed by the decoded
/// secret.
pub(crate) fn hmac_signature(
    secret: &SecretString,
    timestamp: Timestamp,
    method: &Method,
    path: &str,
    body: &str,
) -> Result<String> {
    let key = URL_SAFE
        .decode(secret.expose_secret())
        .map_err(|e| Error::configuration(format!("API secret is not valid base64: {e}")))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| Error::configuration(format!("unusable API secret: {e}")))?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(method.as_str().as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());

    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

pub(crate) fn body_text(request: &Request) -> String {
    request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}
