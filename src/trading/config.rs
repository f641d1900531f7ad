use std::fmt;
use std::str::FromStr as _;
use std::sync::Arc;

use secrecy::SecretString;
use url::Url;

use crate::POLYGON;
use crate::Result;
use crate::auth::builder::BuilderConfig;
use crate::auth::{Credentials, WalletSigner};
use crate::error::Error;
use crate::trading::policy::OrderPolicies;
use crate::trading::types::SignatureTypeInput;
use crate::types::{Address, ChainId, SignatureType};

/// Raw signing values typically passed from app-level bot config (env vars, TOML, ...).
/// Empty strings are treated as unset.
#[derive(Clone, Debug, Default)]
pub struct RawSigningConfig {
    pub private_key: Option<SecretString>,
    pub signature_type: Option<String>,
    pub funder: Option<String>,
    pub builder_key: Option<String>,
    pub builder_secret: Option<SecretString>,
    pub builder_passphrase: Option<SecretString>,
    pub builder_signing_url: Option<String>,
}

/// Client configuration.
///
/// Exactly one of `private_key` (custodial) or `signer` (externally signed) must be set;
/// this is checked when the client is constructed.
#[derive(Clone, bon::Builder)]
pub struct Config {
    pub host: Url,
    #[builder(default = POLYGON)]
    pub chain_id: ChainId,
    #[builder(into)]
    pub private_key: Option<SecretString>,
    pub signer: Option<Arc<dyn WalletSigner>>,
    /// L2 API credentials. Derived from the wallet on first use when absent.
    pub credentials: Option<Credentials>,
    pub builder_config: Option<BuilderConfig>,
    #[builder(default)]
    pub signature_type: SignatureType,
    /// Proxy or Safe wallet that holds the funds. Required for non-EOA signature types.
    pub funder: Option<Address>,
    /// Nonce used when creating or deriving API credentials.
    pub nonce: Option<u32>,
    #[builder(default)]
    pub policies: OrderPolicies,
}

impl Config {
    pub fn from_raw(host: &str, chain_id: ChainId, raw: RawSigningConfig) -> Result<Self> {
        let host = Url::parse(host)?;

        let signature_type = match non_empty(raw.signature_type) {
            Some(value) => SignatureTypeInput::from_str(&value)?.into_signature_type(),
            None => SignatureType::Eoa,
        };
        let funder = non_empty(raw.funder)
            .map(|value| {
                Address::from_str(&value)
                    .map_err(|e| Error::configuration(format!("invalid funder address: {e}")))
            })
            .transpose()?;
        let signing_server_url = non_empty(raw.builder_signing_url)
            .map(|value| Url::parse(&value))
            .transpose()?;

        let builder_config = BuilderConfig {
            key: non_empty(raw.builder_key),
            secret: raw.builder_secret,
            passphrase: raw.builder_passphrase,
            signing_server_url,
        };

        let config = Config::builder()
            .host(host)
            .chain_id(chain_id)
            .maybe_private_key(raw.private_key)
            .builder_config(builder_config)
            .signature_type(signature_type)
            .maybe_funder(funder)
            .build();
        config.validate()?;
        Ok(config)
    }

    /// Checks the funder / signature type pairing.
    pub fn validate(&self) -> Result<()> {
        match (self.signature_type, self.funder) {
            (SignatureType::Eoa, Some(_)) => Err(Error::configuration(
                "Cannot have a funder address with an Eoa signature type",
            )),
            (SignatureType::Eoa, None) => Ok(()),
            (_, Some(funder)) if funder != Address::ZERO => Ok(()),
            (other, _) => Err(Error::configuration(format!(
                "{other} signature type requires a non-zero funder address"
            ))),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host.as_str())
            .field("chain_id", &self.chain_id)
            .field("private_key", &self.private_key)
            .field("signer", &self.signer.as_ref().map(|_| ".."))
            .field("credentials", &self.credentials)
            .field("builder_config", &self.builder_config)
            .field("signature_type", &self.signature_type)
            .field("funder", &self.funder)
            .field("nonce", &self.nonce)
            .field("policies", &self.policies)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
