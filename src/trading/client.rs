use crate::Result;
use crate::auth::builder::BuilderAttribution;
use crate::auth::{AuthMode, WalletAddress, WalletIdentity};
use crate::error::Error;
use crate::gateway::{CancelOutcome, ExchangeGateway, HttpGateway};
use crate::trading::compose::compose;
use crate::trading::normalize::{Lookup, normalize};
use crate::trading::{Config, Order, OrderRequest, PlacedOrder};
use crate::types::Address;

/// Order lifecycle client.
///
/// Holds no order state of its own: every read goes to the exchange, and calls on the same
/// client are independent of each other. Callers that need ordering (cancel, then place)
/// must await the first call before issuing the second.
#[derive(Debug)]
pub struct TradingClient<G = HttpGateway> {
    auth_mode: AuthMode,
    builder: BuilderAttribution,
    identity: WalletIdentity,
    gateway: G,
}

impl TradingClient<HttpGateway> {
    /// Creates a client talking to the exchange REST API at `config.host`.
    ///
    /// In externally-signed mode the wallet address is still [`WalletAddress::Pending`]
    /// afterwards; await [`TradingClient::wallet_ready`] or use [`TradingClient::connect`].
    pub fn new(config: Config) -> Result<Self> {
        let (auth_mode, builder, identity) = resolve(&config)?;
        let gateway = HttpGateway::new(&config, identity.clone(), builder.clone())?;

        Ok(Self {
            auth_mode,
            builder,
            identity,
            gateway,
        })
    }

    /// [`TradingClient::new`], then waits until the wallet address is known. Preferred in
    /// externally-signed mode: the signer is asked for its address once, here.
    pub async fn connect(config: Config) -> Result<Self> {
        let client = Self::new(config)?;
        client.wallet_ready().await?;
        Ok(client)
    }
}

impl<G: ExchangeGateway> TradingClient<G> {
    /// Creates a client on top of any gateway implementation. The wallet address stays
    /// [`WalletAddress::Pending`] for an external signer until it is first needed.
    pub fn with_gateway(config: &Config, gateway: G) -> Result<Self> {
        let (auth_mode, builder, identity) = resolve(config)?;

        Ok(Self {
            auth_mode,
            builder,
            identity,
            gateway,
        })
    }

    /// [`TradingClient::with_gateway`], then waits until the wallet address is known.
    pub async fn connect_with_gateway(config: &Config, gateway: G) -> Result<Self> {
        let client = Self::with_gateway(config, gateway)?;
        client.wallet_ready().await?;
        Ok(client)
    }

    #[must_use]
    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth_mode
    }

    #[must_use]
    pub fn builder_attribution(&self) -> &BuilderAttribution {
        &self.builder
    }

    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Current wallet address, or [`WalletAddress::Pending`] while an external signer has not
    /// answered yet. Never blocks.
    #[must_use]
    pub fn get_wallet_address(&self) -> WalletAddress {
        self.identity.current()
    }

    /// Resolves the wallet address. The signer is asked at most once per client; every caller
    /// awaits the same lookup.
    pub async fn wallet_ready(&self) -> Result<Address> {
        self.identity
            .resolve()
            .await
            .map_err(|e| failed("Failed to resolve wallet address", e))
    }

    /// Validates, submits and returns the exchange acknowledgement.
    ///
    /// Validation failures are returned before the gateway is called.
    pub async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder> {
        let result = async {
            let wire = compose(request)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(token_id = %wire.token_id, side = %wire.side, price = %wire.price, size = %wire.size, "placing order");

            let response = self.gateway.submit(&wire).await?;

            #[cfg(feature = "tracing")]
            tracing::info!(order_id = %response.order_id, status = %response.status, "order placed");

            Ok::<_, Error>(PlacedOrder {
                order_id: response.order_id,
                status: response.status,
            })
        }
        .await;

        result.map_err(|e| failed("Failed to place order", e))
    }

    /// Cancels one order and returns the exchange's report unchanged. Cancelling an unknown or
    /// already filled order yields whatever the exchange says about it.
    pub async fn cancel_order(&self, order_id: &str) -> Result<CancelOutcome> {
        let result = async {
            require_order_id(order_id)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(order_id, "cancelling order");

            self.gateway.cancel_one(order_id).await
        }
        .await;

        result.map_err(|e| failed("Failed to cancel order", e))
    }

    /// Cancels a batch in a single exchange call. The outcome is itemized per order id; some
    /// may be cancelled while others are not.
    pub async fn cancel_orders(&self, order_ids: &[String]) -> Result<CancelOutcome> {
        let result = async {
            if order_ids.is_empty() {
                return Err(Error::validation("order ids must not be empty"));
            }
            for order_id in order_ids {
                require_order_id(order_id)?;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(count = order_ids.len(), "cancelling orders");

            self.gateway.cancel_many(order_ids).await
        }
        .await;

        result.map_err(|e| failed("Failed to cancel orders", e))
    }

    /// Open orders of the authenticated wallet.
    ///
    /// `address` is accepted for symmetry with other clients but does not filter anything:
    /// the exchange always answers for the wallet that signed the request.
    pub async fn get_open_orders(&self, _address: Option<Address>) -> Result<Vec<Order>> {
        let result = async {
            let raw = self.gateway.list_open().await?;
            raw.into_iter()
                .map(|record| normalize(record, Lookup::Listing))
                .collect::<Result<Vec<_>>>()
        }
        .await;

        result.map_err(|e| failed("Failed to get open orders", e))
    }

    /// One order by id. `Ok(None)` means the exchange does not know the order; transport and
    /// exchange failures are still errors.
    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let result = async {
            require_order_id(order_id)?;
            match self.gateway.get_one(order_id).await? {
                Some(record) => normalize(record, Lookup::Single).map(Some),
                None => Ok(None),
            }
        }
        .await;

        result.map_err(|e| failed("Failed to get order", e))
    }
}

fn resolve(config: &Config) -> Result<(AuthMode, BuilderAttribution, WalletIdentity)> {
    let auth_mode = AuthMode::resolve(
        config.private_key.as_ref(),
        config.signer.clone(),
        config.chain_id,
    )?;
    config.validate()?;

    let builder = BuilderAttribution::resolve(config.builder_config.as_ref());
    let identity = WalletIdentity::new(&auth_mode);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        custodial = auth_mode.is_custodial(),
        builder_attribution = builder.is_enabled(),
        "resolved auth mode"
    );

    Ok((auth_mode, builder, identity))
}

fn require_order_id(order_id: &str) -> Result<()> {
    if order_id.trim().is_empty() {
        return Err(Error::validation("order id must not be empty"));
    }
    Ok(())
}

fn failed(operation: &'static str, err: Error) -> Error {
    #[cfg(feature = "tracing")]
    tracing::warn!(operation, kind = %err.kind(), error = %err, "trading operation failed");

    err.context(operation)
}
