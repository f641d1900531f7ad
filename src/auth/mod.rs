//! Signing mode selection and wallet identity.
//!
//! A client runs in exactly one [`AuthMode`]: either it holds a private key itself
//! ([`AuthMode::CustodialKey`]) or it delegates to a caller-supplied [`WalletSigner`]
//! ([`AuthMode::ExternalSigner`]). The mode is chosen once by [`AuthMode::resolve`] and never
//! changes for the life of the client.

pub mod builder;
pub mod l1;
pub mod l2;

use std::fmt;
use std::str::FromStr as _;
use std::sync::Arc;

use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::Result;
use crate::error::Error;
use crate::types::{Address, B256, ChainId, Signature};

/// Signing capability supplied by the caller in externally-signed mode.
///
/// Every [`alloy::signers::Signer`] implements this, so local keys, hardware wallets and KMS
/// signers plug in directly.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Controlling address of the wallet. May require a remote round trip.
    async fn address(&self) -> Result<Address>;

    async fn sign_hash(&self, hash: &B256) -> Result<Signature>;
}

#[async_trait]
impl<S> WalletSigner for S
where
    S: Signer + Send + Sync,
{
    async fn address(&self) -> Result<Address> {
        Ok(Signer::address(self))
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        Ok(Signer::sign_hash(self, hash).await?)
    }
}

/// How this client signs.
#[non_exhaustive]
#[derive(Clone)]
pub enum AuthMode {
    /// The client holds the key material.
    CustodialKey(PrivateKeySigner),
    /// Signing is delegated; the client never sees key material.
    ExternalSigner(Arc<dyn WalletSigner>),
}

impl AuthMode {
    /// Selects the auth mode from the two mutually exclusive configuration blocks.
    ///
    /// Supplying both, or neither, is a configuration error.
    pub fn resolve(
        private_key: Option<&SecretString>,
        signer: Option<Arc<dyn WalletSigner>>,
        chain_id: ChainId,
    ) -> Result<Self> {
        match (private_key, signer) {
            (Some(_), Some(_)) => Err(Error::configuration(
                "ambiguous auth mode: both a private key and an external signer were configured",
            )),
            (None, None) => Err(Error::configuration(
                "missing auth mode: configure either a private key or an external signer",
            )),
            (Some(key), None) => {
                let signer = PrivateKeySigner::from_str(key.expose_secret())
                    .map_err(|e| Error::configuration(format!("invalid private key: {e}")))?
                    .with_chain_id(Some(chain_id));
                Ok(AuthMode::CustodialKey(signer))
            }
            (None, Some(signer)) => Ok(AuthMode::ExternalSigner(signer)),
        }
    }

    /// The signer orders and auth headers are produced with.
    #[must_use]
    pub fn signer(&self) -> Arc<dyn WalletSigner> {
        match self {
            AuthMode::CustodialKey(key) => Arc::new(key.clone()),
            AuthMode::ExternalSigner(signer) => Arc::clone(signer),
        }
    }

    #[must_use]
    pub fn is_custodial(&self) -> bool {
        matches!(self, AuthMode::CustodialKey(_))
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::CustodialKey(key) => f
                .debug_tuple("CustodialKey")
                .field(&Signer::address(key))
                .finish(),
            AuthMode::ExternalSigner(_) => f.write_str("ExternalSigner(..)"),
        }
    }
}

/// Wallet address as currently known to the client.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalletAddress {
    Ready(Address),
    /// The external signer has not answered the address lookup yet. Not a permanent absence.
    Pending,
}

impl WalletAddress {
    #[must_use]
    pub fn ready(self) -> Option<Address> {
        match self {
            WalletAddress::Ready(address) => Some(address),
            WalletAddress::Pending => None,
        }
    }
}

/// Address of the active auth mode, resolved at most once and shared by every clone.
///
/// Known at construction in custodial mode. In externally-signed mode the first call to
/// [`WalletIdentity::resolve`] performs the signer lookup; concurrent callers wait on the same
/// lookup instead of issuing their own.
#[derive(Clone)]
pub struct WalletIdentity {
    signer: Arc<dyn WalletSigner>,
    address: Arc<OnceCell<Address>>,
}

impl WalletIdentity {
    #[must_use]
    pub fn new(mode: &AuthMode) -> Self {
        let address = match mode {
            AuthMode::CustodialKey(key) => OnceCell::new_with(Some(Signer::address(key))),
            AuthMode::ExternalSigner(_) => OnceCell::new(),
        };
        Self {
            signer: mode.signer(),
            address: Arc::new(address),
        }
    }

    /// Non-blocking read.
    #[must_use]
    pub fn current(&self) -> WalletAddress {
        self.address
            .get()
            .map_or(WalletAddress::Pending, |address| WalletAddress::Ready(*address))
    }

    /// Waits for the address, performing the signer lookup if nobody has yet. A failed lookup
    /// leaves the identity pending so a later call can retry.
    pub async fn resolve(&self) -> Result<Address> {
        let address = self
            .address
            .get_or_try_init(|| async {
                let address = self.signer.address().await?;

                #[cfg(feature = "tracing")]
                tracing::debug!(%address, "resolved wallet address from external signer");

                Ok::<_, Error>(address)
            })
            .await?;
        Ok(*address)
    }

    #[must_use]
    pub fn signer(&self) -> &Arc<dyn WalletSigner> {
        &self.signer
    }
}

impl fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.current())
            .finish_non_exhaustive()
    }
}

/// L2 API credentials issued by the exchange for a wallet.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    #[serde(rename = "apiKey")]
    key: String,
    secret: SecretString,
    passphrase: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(key: String, secret: SecretString, passphrase: SecretString) -> Self {
        Self {
            key,
            secret,
            passphrase,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub(crate) fn passphrase(&self) -> &SecretString {
        &self.passphrase
    }
}
