use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};
use tokio::sync::OnceCell;
use url::Url;

use crate::auth::builder::BuilderAttribution;
use crate::auth::{self, Credentials, WalletIdentity};
use crate::error::{Error, Kind as ErrorKind};
use crate::gateway::signing::{SigningContext, sign_order};
use crate::gateway::{CancelOutcome, ExchangeGateway, RawOrder, SubmitResponse};
use crate::trading::{Config, FixedOrFetch, OrderPolicies, TimePolicy, WireOrder};
use crate::types::{Address, ChainId, Decimal, SignatureType, TickSize};
use crate::{Result, Timestamp, contract_config};

const INITIAL_CURSOR: &str = "MA==";
const END_CURSOR: &str = "LTE=";

/// [`ExchangeGateway`] over the CLOB REST API.
///
/// API credentials are taken from the config or created/derived with the wallet on first use,
/// then kept for the life of the gateway. Market parameters set to
/// [`FixedOrFetch::Fetch`] are fetched once per token and cached.
#[derive(Debug)]
pub struct HttpGateway {
    host: Url,
    chain_id: ChainId,
    nonce: Option<u32>,
    identity: WalletIdentity,
    signature_type: SignatureType,
    funder: Option<Address>,
    policies: OrderPolicies,
    builder: BuilderAttribution,
    credentials: OnceCell<Credentials>,
    tick_sizes: DashMap<String, TickSize>,
    neg_risk: DashMap<String, bool>,
    fee_rates: DashMap<String, u32>,
    client: ReqwestClient,
}

#[derive(Deserialize)]
struct PostOrderResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(rename = "errorMsg", default)]
    error_msg: String,
    #[serde(rename = "orderID", default)]
    order_id: String,
    #[serde(default)]
    status: String,
}

const fn default_success() -> bool {
    true
}

#[serde_as]
#[derive(Deserialize)]
struct OrdersPage {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    data: Vec<RawOrder>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct TickSizeResponse {
    minimum_tick_size: Decimal,
}

#[derive(Deserialize)]
struct NegRiskResponse {
    neg_risk: bool,
}

#[derive(Deserialize)]
struct FeeRateResponse {
    base_fee: u32,
}

#[derive(Serialize)]
struct CancelOneRequest<'id> {
    #[serde(rename = "orderID")]
    order_id: &'id str,
}

impl HttpGateway {
    pub fn new(
        config: &Config,
        identity: WalletIdentity,
        builder: BuilderAttribution,
    ) -> Result<Self> {
        Self::with_client(config, identity, builder, ReqwestClient::new())
    }

    /// Same as [`HttpGateway::new`] with a custom HTTP client (proxies, timeouts, ...).
    pub fn with_client(
        config: &Config,
        identity: WalletIdentity,
        builder: BuilderAttribution,
        client: ReqwestClient,
    ) -> Result<Self> {
        config.validate()?;
        for neg_risk in [false, true] {
            if contract_config(config.chain_id, neg_risk).is_none() {
                return Err(Error::missing_contract_config(config.chain_id, neg_risk));
            }
        }

        let credentials = match &config.credentials {
            Some(credentials) => OnceCell::new_with(Some(credentials.clone())),
            None => OnceCell::new(),
        };

        Ok(Self {
            host: config.host.clone(),
            chain_id: config.chain_id,
            nonce: config.nonce,
            identity,
            signature_type: config.signature_type,
            funder: config.funder,
            policies: config.policies,
            builder,
            credentials,
            tick_sizes: DashMap::new(),
            neg_risk: DashMap::new(),
            fee_rates: DashMap::new(),
            client,
        })
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    /// API credentials, creating or deriving them with the wallet the first time.
    pub async fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .get_or_try_init(|| self.create_or_derive_api_key())
            .await
    }

    /// Exchange clock, in unix seconds.
    pub async fn server_time(&self) -> Result<Timestamp> {
        let request = self
            .client
            .request(Method::GET, self.endpoint("time")?)
            .build()?;
        crate::request::<Timestamp>(&self.client, request, None).await
    }

    async fn create_or_derive_api_key(&self) -> Result<Credentials> {
        match self.create_api_key().await {
            Ok(creds) => Ok(creds),
            Err(err) if err.kind() == ErrorKind::Rejection => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "API key creation refused, deriving existing key");

                self.derive_api_key().await
            }
            Err(err) => Err(err),
        }
    }

    async fn create_api_key(&self) -> Result<Credentials> {
        let request = self
            .client
            .request(Method::POST, self.endpoint("auth/api-key")?)
            .build()?;
        let headers = self.create_l1_headers().await?;

        crate::request::<Credentials>(&self.client, request, Some(headers)).await
    }

    async fn derive_api_key(&self) -> Result<Credentials> {
        let request = self
            .client
            .request(Method::GET, self.endpoint("auth/derive-api-key")?)
            .build()?;
        let headers = self.create_l1_headers().await?;

        crate::request::<Credentials>(&self.client, request, Some(headers)).await
    }

    async fn create_l1_headers(&self) -> Result<HeaderMap> {
        let address = self.identity.resolve().await?;
        let timestamp = self.timestamp().await?;
        auth::l1::create_headers(
            self.identity.signer().as_ref(),
            address,
            self.chain_id,
            timestamp,
            self.nonce,
        )
        .await
    }

    async fn create_l2_headers(&self, request: &Request) -> Result<(HeaderMap, Timestamp)> {
        let address = self.identity.resolve().await?;
        let credentials = self.credentials().await?;
        let timestamp = self.timestamp().await?;
        let headers = auth::l2::create_headers(address, credentials, request, timestamp)?;
        Ok((headers, timestamp))
    }

    async fn authenticated<R: DeserializeOwned>(&self, request: Request) -> Result<R> {
        let (headers, _) = self.create_l2_headers(&request).await?;
        crate::request::<R>(&self.client, request, Some(headers)).await
    }

    async fn timestamp(&self) -> Result<Timestamp> {
        match self.policies.time {
            TimePolicy::Local => Ok(Utc::now().timestamp()),
            TimePolicy::Server => self.server_time().await,
        }
    }

    async fn tick_size(&self, token_id: &str) -> Result<TickSize> {
        if let FixedOrFetch::Fixed(tick_size) = self.policies.tick_size {
            return Ok(tick_size);
        }
        if let Some(cached) = self.tick_sizes.get(token_id) {
            return Ok(*cached);
        }

        let response: TickSizeResponse = self.market_query("tick-size", token_id).await?;
        let tick_size = TickSize::try_from(response.minimum_tick_size)?;
        self.tick_sizes.insert(token_id.to_owned(), tick_size);
        Ok(tick_size)
    }

    async fn neg_risk(&self, token_id: &str) -> Result<bool> {
        if let FixedOrFetch::Fixed(neg_risk) = self.policies.neg_risk {
            return Ok(neg_risk);
        }
        if let Some(cached) = self.neg_risk.get(token_id) {
            return Ok(*cached);
        }

        let response: NegRiskResponse = self.market_query("neg-risk", token_id).await?;
        self.neg_risk.insert(token_id.to_owned(), response.neg_risk);
        Ok(response.neg_risk)
    }

    async fn fee_rate_bps(&self, token_id: &str) -> Result<u32> {
        if let FixedOrFetch::Fixed(fee_rate_bps) = self.policies.fee_rate_bps {
            return Ok(fee_rate_bps);
        }
        if let Some(cached) = self.fee_rates.get(token_id) {
            return Ok(*cached);
        }

        let response: FeeRateResponse = self.market_query("fee-rate", token_id).await?;
        self.fee_rates.insert(token_id.to_owned(), response.base_fee);
        Ok(response.base_fee)
    }

    async fn market_query<R: DeserializeOwned>(&self, path: &str, token_id: &str) -> Result<R> {
        let request = self
            .client
            .request(Method::GET, self.endpoint(path)?)
            .query(&[("token_id", token_id)])
            .build()?;
        crate::request::<R>(&self.client, request, None).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.host.join(path)?)
    }
}

#[async_trait]
impl ExchangeGateway for HttpGateway {
    async fn submit(&self, order: &WireOrder) -> Result<SubmitResponse> {
        let tick_size = self.tick_size(&order.token_id).await?;
        let neg_risk = self.neg_risk(&order.token_id).await?;
        let fee_rate_bps = self.fee_rate_bps(&order.token_id).await?;
        let signer = self.identity.resolve().await?;

        let context = SigningContext {
            chain_id: self.chain_id,
            signer,
            maker: self.funder.unwrap_or(signer),
            signature_type: self.signature_type,
            tick_size,
            neg_risk,
            fee_rate_bps,
        };
        let signed = sign_order(self.identity.signer().as_ref(), order, &context).await?;

        let credentials = self.credentials().await?;
        let request = self
            .client
            .request(Method::POST, self.endpoint("order")?)
            .json(&signed.payload(credentials.key()))
            .build()?;
        let path = request.url().path().to_owned();

        let (mut headers, timestamp) = self.create_l2_headers(&request).await?;
        if let Some(builder_headers) = self
            .builder
            .create_headers(&self.client, &request, timestamp)
            .await?
        {
            headers.extend(builder_headers);
        }

        let response: PostOrderResponse =
            crate::request(&self.client, request, Some(headers)).await?;

        if !response.success {
            return Err(Error::rejection(
                StatusCode::OK,
                Method::POST,
                path,
                response.error_msg,
            ));
        }
        if response.order_id.is_empty() {
            return Err(Error::malformed("order accepted without an orderID"));
        }

        Ok(SubmitResponse::new(response.order_id, response.status))
    }

    async fn cancel_one(&self, order_id: &str) -> Result<CancelOutcome> {
        let request = self
            .client
            .request(Method::DELETE, self.endpoint("order")?)
            .json(&CancelOneRequest { order_id })
            .build()?;
        self.authenticated(request).await
    }

    async fn cancel_many(&self, order_ids: &[String]) -> Result<CancelOutcome> {
        let request = self
            .client
            .request(Method::DELETE, self.endpoint("orders")?)
            .json(order_ids)
            .build()?;
        self.authenticated(request).await
    }

    async fn list_open(&self) -> Result<Vec<RawOrder>> {
        let mut orders = Vec::new();
        let mut cursor = INITIAL_CURSOR.to_owned();
        let mut seen = HashSet::new();

        loop {
            if !seen.insert(cursor.clone()) {
                return Err(Error::malformed(format!(
                    "open orders cursor {cursor} was already visited"
                )));
            }

            let request = self
                .client
                .request(Method::GET, self.endpoint("data/orders")?)
                .query(&[("next_cursor", cursor.as_str())])
                .build()?;
            let page: OrdersPage = self.authenticated(request).await?;
            orders.extend(page.data);

            match page.next_cursor {
                Some(next) if !next.is_empty() && next != END_CURSOR => {
                    cursor = next;
                }
                _ => break,
            }
        }

        Ok(orders)
    }

    async fn get_one(&self, order_id: &str) -> Result<Option<RawOrder>> {
        if matches!(order_id, "." | "..") {
            return Err(Error::validation(format!("invalid order id `{order_id}`")));
        }

        // One percent-encoded segment, so the id cannot leave `data/order/`.
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|()| Error::configuration(format!("host {} cannot be a base", self.host)))?
            .pop_if_empty()
            .extend(["data", "order", order_id]);

        let request = self.client.request(Method::GET, url).build()?;
        let (headers, _) = self.create_l2_headers(&request).await?;
        crate::request_optional::<RawOrder>(&self.client, request, Some(headers)).await
    }
}
