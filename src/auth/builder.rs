//! Builder attribution: tagging outbound orders with the integrator that produced them.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Request};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use url::Url;

use crate::auth::Credentials;
use crate::auth::l2::{body_text, hmac_signature};
use crate::error::Error;
use crate::{Result, Timestamp};

const POLY_BUILDER_API_KEY: &str = "poly_builder_api_key";
const POLY_BUILDER_PASSPHRASE: &str = "poly_builder_passphrase";
const POLY_BUILDER_SIGNATURE: &str = "poly_builder_signature";
const POLY_BUILDER_TIMESTAMP: &str = "poly_builder_timestamp";
const BUILDER_HEADER_PREFIX: &str = "poly_builder_";

/// Optional builder block of the client configuration. Every field may be left unset.
#[derive(Clone, Debug, Default, bon::Builder)]
pub struct BuilderConfig {
    #[builder(into)]
    pub key: Option<String>,
    #[builder(into)]
    pub secret: Option<SecretString>,
    #[builder(into)]
    pub passphrase: Option<SecretString>,
    pub signing_server_url: Option<Url>,
}

/// Which attribution path outbound orders take.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum BuilderAttribution {
    /// Builder API credentials held locally; orders carry HMAC builder headers.
    LocalCredentials(Credentials),
    /// A signing service produces the builder headers for each order.
    RemoteSigning { signing_server_url: Url },
    None,
}

impl BuilderAttribution {
    /// Total over any configuration: a signing server URL wins, then a complete local
    /// credential triple, otherwise no attribution. Empty strings count as unset.
    #[must_use]
    pub fn resolve(config: Option<&BuilderConfig>) -> Self {
        let Some(config) = config else {
            return BuilderAttribution::None;
        };

        if let Some(url) = &config.signing_server_url {
            return BuilderAttribution::RemoteSigning {
                signing_server_url: url.clone(),
            };
        }

        let key = config.key.as_deref().filter(|k| !k.trim().is_empty());
        let secret = config.secret.as_ref().filter(|s| !s.expose_secret().is_empty());
        let passphrase = config
            .passphrase
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty());

        match (key, secret, passphrase) {
            (Some(key), Some(secret), Some(passphrase)) => {
                BuilderAttribution::LocalCredentials(Credentials::new(
                    key.to_owned(),
                    secret.clone(),
                    passphrase.clone(),
                ))
            }
            _ => BuilderAttribution::None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, BuilderAttribution::None)
    }

    /// Builder headers for `request`, or `None` when attribution is disabled.
    pub(crate) async fn create_headers(
        &self,
        client: &ReqwestClient,
        request: &Request,
        timestamp: Timestamp,
    ) -> Result<Option<HeaderMap>> {
        match self {
            BuilderAttribution::None => Ok(None),
            BuilderAttribution::LocalCredentials(credentials) => {
                local_headers(credentials, request, timestamp).map(Some)
            }
            BuilderAttribution::RemoteSigning { signing_server_url } => {
                remote_headers(client, signing_server_url, request, timestamp)
                    .await
                    .map(Some)
            }
        }
    }
}

fn local_headers(
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
    map.insert(
        POLY_BUILDER_API_KEY,
        HeaderValue::from_str(credentials.key())?,
    );
    map.insert(
        POLY_BUILDER_PASSPHRASE,
        HeaderValue::from_str(credentials.passphrase().expose_secret())?,
    );
    map.insert(POLY_BUILDER_SIGNATURE, HeaderValue::from_str(&signature)?);
    map.insert(
        POLY_BUILDER_TIMESTAMP,
        HeaderValue::from_str(&timestamp.to_string())?,
    );
    Ok(map)
}

#[derive(Serialize)]
struct RemoteSignRequest<'req> {
    method: &'req str,
    path: &'req str,
    body: &'req str,
    timestamp: Timestamp,
}

async fn remote_headers(
    client: &ReqwestClient,
    signing_server_url: &Url,
    request: &Request,
    timestamp: Timestamp,
) -> Result<HeaderMap> {
    let body = body_text(request);
    let payload = RemoteSignRequest {
        method: request.method().as_str(),
        path: request.url().path(),
        body: &body,
        timestamp,
    };
    let sign_request = client
        .request(Method::POST, signing_server_url.clone())
        .json(&payload)
        .build()?;

    let response: HashMap<String, String> =
        crate::request(client, sign_request, None).await?;

    builder_headers(response)
}

/// Keeps only `poly_builder_*` entries of a signing server answer. Anything else would
/// overwrite the wallet's own L2 headers.
fn builder_headers(response: HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in response {
        let name = name.to_ascii_lowercase();
        if !name.starts_with(BUILDER_HEADER_PREFIX) {
            #[cfg(feature = "tracing")]
            tracing::warn!(header = %name, "ignoring non-builder header from signing server");
            continue;
        }

        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::malformed(format!("signing server returned bad header {name}: {e}"))
        })?;
        map.insert(name, HeaderValue::from_str(&value)?);
    }

    if map.is_empty() {
        return Err(Error::malformed(
            "signing server returned no builder headers",
        ));
    }
    Ok(map)
}
