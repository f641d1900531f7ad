use std::str::FromStr as _;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use clob_order_client::auth::{Credentials, WalletAddress, WalletSigner};
use clob_order_client::auth::builder::BuilderConfig;
use clob_order_client::error::Kind;
use clob_order_client::trading::{
    Config, FixedOrFetch, OrderPolicies, OrderRequest, TimePolicy, TradingClient,
};
use clob_order_client::types::{Side, TickSize};
use httpmock::Method::{DELETE, GET, POST};
use httpmock::MockServer;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const SECRET: &str = "c2VjcmV0LXNlY3JldC1zZWNyZXQ=";
const TOKEN: &str = "1234";

fn credentials() -> Credentials {
    Credentials::new(
        "api-key".to_owned(),
        SecretString::from(SECRET),
        SecretString::from("phrase"),
    )
}

fn fixed_policies() -> OrderPolicies {
    OrderPolicies::builder()
        .tick_size(FixedOrFetch::Fixed(TickSize::Hundredth))
        .neg_risk(FixedOrFetch::Fixed(false))
        .fee_rate_bps(FixedOrFetch::Fixed(0))
        .build()
}

fn config(server: &MockServer) -> anyhow::Result<Config> {
    Ok(Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .credentials(credentials())
        .policies(fixed_policies())
        .build())
}

fn buy() -> OrderRequest {
    OrderRequest::new(TOKEN, Side::Buy, dec!(0.65), dec!(10))
}

fn open_order(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": "LIVE",
        "asset_id": TOKEN,
        "side": "BUY",
        "price": "0.65",
        "original_size": "10",
        "size_matched": "0",
        "created_at": 1_700_000_000,
    })
}

#[tokio::test]
async fn place_order_posts_signed_order_with_l2_headers() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let wallet = PrivateKeySigner::from_str(KEY)?.address();
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/order")
                .header("poly_api_key", "api-key")
                .header("poly_passphrase", "phrase")
                .header("poly_address", wallet.to_checksum(None))
                .header_exists("poly_signature")
                .header_exists("poly_timestamp");
            then.status(200).json_body(json!({
                "success": true,
                "errorMsg": "",
                "orderID": "0xabc",
                "status": "live",
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let placed = client.place_order(&buy()).await?;

    mock.assert_async().await;
    assert_eq!(placed.order_id, "0xabc");
    assert_eq!(placed.status, "live");
    Ok(())
}

#[tokio::test]
async fn unsuccessful_submission_is_a_rejection() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/order");
            then.status(200).json_body(json!({
                "success": false,
                "errorMsg": "not enough balance / allowance",
                "orderID": "",
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let err = client
        .place_order(&buy())
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("submission should fail"))?;

    assert_eq!(err.kind(), Kind::Rejection);
    assert_eq!(err.operation(), Some("Failed to place order"));
    assert!(err.to_string().contains("not enough balance"));
    Ok(())
}

#[tokio::test]
async fn market_parameters_are_fetched_once_per_token() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let tick_size = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/tick-size")
                .query_param("token_id", TOKEN);
            then.status(200)
                .json_body(json!({ "minimum_tick_size": "0.01" }));
        })
        .await;
    let neg_risk = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/neg-risk")
                .query_param("token_id", TOKEN);
            then.status(200).json_body(json!({ "neg_risk": true }));
        })
        .await;
    let fee_rate = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fee-rate")
                .query_param("token_id", TOKEN);
            then.status(200).json_body(json!({ "base_fee": 0 }));
        })
        .await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST).path("/order");
            then.status(200)
                .json_body(json!({ "success": true, "orderID": "0xabc", "status": "live" }));
        })
        .await;

    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .credentials(credentials())
        .build();
    let client = TradingClient::new(config)?;

    client.place_order(&buy()).await?;
    client.place_order(&buy()).await?;

    tick_size.assert_hits_async(1).await;
    neg_risk.assert_hits_async(1).await;
    fee_rate.assert_hits_async(1).await;
    submit.assert_hits_async(2).await;
    Ok(())
}

#[tokio::test]
async fn server_time_policy_signs_with_exchange_clock() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let time = server
        .mock_async(|when, then| {
            when.method(GET).path("/time");
            then.status(200).body("1700000000");
        })
        .await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/order")
                .header("poly_timestamp", "1700000000");
            then.status(200)
                .json_body(json!({ "success": true, "orderID": "0xabc", "status": "live" }));
        })
        .await;

    let policies = OrderPolicies {
        time: TimePolicy::Server,
        ..fixed_policies()
    };
    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .credentials(credentials())
        .policies(policies)
        .build();

    TradingClient::new(config)?.place_order(&buy()).await?;

    time.assert_async().await;
    submit.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn remote_builder_signing_adds_returned_headers() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let signing = server
        .mock_async(|when, then| {
            when.method(POST).path("/sign");
            then.status(200).json_body(json!({
                "POLY_BUILDER_API_KEY": "builder-key",
                "POLY_BUILDER_PASSPHRASE": "builder-phrase",
                "POLY_BUILDER_SIGNATURE": "c2lnbmF0dXJl",
                "POLY_BUILDER_TIMESTAMP": "1700000000",
            }));
        })
        .await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/order")
                .header("poly_builder_api_key", "builder-key")
                .header("poly_builder_signature", "c2lnbmF0dXJl")
                .header_exists("poly_api_key");
            then.status(200)
                .json_body(json!({ "success": true, "orderID": "0xabc", "status": "live" }));
        })
        .await;

    let builder = BuilderConfig::builder()
        .signing_server_url(Url::parse(&server.url("/sign"))?)
        .build();
    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .credentials(credentials())
        .builder_config(builder)
        .policies(fixed_policies())
        .build();

    TradingClient::new(config)?.place_order(&buy()).await?;

    signing.assert_async().await;
    submit.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn local_builder_credentials_sign_the_order_request() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/order")
                .header("poly_builder_api_key", "builder-key")
                .header("poly_builder_passphrase", "builder-phrase")
                .header_exists("poly_builder_signature")
                .header_exists("poly_builder_timestamp");
            then.status(200)
                .json_body(json!({ "success": true, "orderID": "0xabc", "status": "live" }));
        })
        .await;

    let builder = BuilderConfig::builder()
        .key("builder-key")
        .secret(SECRET)
        .passphrase("builder-phrase")
        .build();
    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .credentials(credentials())
        .builder_config(builder)
        .policies(fixed_policies())
        .build();

    TradingClient::new(config)?.place_order(&buy()).await?;

    submit.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn missing_credentials_are_derived_once_after_create_is_refused() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/api-key")
                .header_exists("poly_signature")
                .header("poly_nonce", "0");
            then.status(400)
                .json_body(json!({ "error": "Could not create api key" }));
        })
        .await;
    let derive = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/derive-api-key")
                .header_exists("poly_signature");
            then.status(200).json_body(json!({
                "apiKey": "derived-key",
                "secret": SECRET,
                "passphrase": "derived-phrase",
            }));
        })
        .await;
    let orders = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .header("poly_api_key", "derived-key");
            then.status(200).json_body(json!({
                "data": [open_order("O1")],
                "next_cursor": "LTE=",
            }));
        })
        .await;

    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .private_key(KEY)
        .build();
    let client = TradingClient::new(config)?;

    assert_eq!(client.get_open_orders(None).await?.len(), 1);
    assert_eq!(client.get_open_orders(None).await?.len(), 1);

    create.assert_hits_async(1).await;
    derive.assert_hits_async(1).await;
    orders.assert_hits_async(2).await;
    assert_eq!(
        client.gateway().credentials().await?.key(),
        "derived-key"
    );
    Ok(())
}

#[tokio::test]
async fn open_orders_follow_the_cursor_to_the_end() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .query_param("next_cursor", "MA==");
            then.status(200).json_body(json!({
                "data": [open_order("O1"), open_order("O2")],
                "next_cursor": "Mg==",
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .query_param("next_cursor", "Mg==");
            then.status(200).json_body(json!({
                "data": [open_order("O3")],
                "next_cursor": "LTE=",
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let orders = client.get_open_orders(None).await?;

    first.assert_async().await;
    second.assert_async().await;
    let ids: Vec<_> = orders.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, ["O1", "O2", "O3"]);
    assert!(orders.iter().all(|o| o.status == "LIVE"));
    Ok(())
}

#[tokio::test]
async fn unknown_order_is_none() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/order/missing");
            then.status(404).body("order not found");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/order/O1");
            then.status(200).json_body(open_order("O1"));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;

    assert_eq!(client.get_order("missing").await?, None);
    let order = client
        .get_order("O1")
        .await?
        .ok_or_else(|| anyhow::anyhow!("order O1 should exist"))?;
    assert_eq!(order.order_id, "O1");
    assert_eq!(order.price, dec!(0.65));
    Ok(())
}

#[tokio::test]
async fn cancels_send_ids_and_return_itemized_report() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let one = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/order")
                .json_body(json!({ "orderID": "O1" }));
            then.status(200)
                .json_body(json!({ "canceled": ["O1"], "not_canceled": null }));
        })
        .await;
    let many = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/orders")
                .json_body(json!(["O1", "O2"]));
            then.status(200).json_body(json!({
                "canceled": ["O1"],
                "not_canceled": { "O2": "order can't be found - already canceled or matched" },
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;

    let single = client.cancel_order("O1").await?;
    assert!(single.is_complete());

    let batch = client
        .cancel_orders(&["O1".to_owned(), "O2".to_owned()])
        .await?;
    assert_eq!(batch.canceled, vec!["O1".to_owned()]);
    assert!(batch.not_canceled.contains_key("O2"));

    one.assert_async().await;
    many.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn exchange_error_status_is_a_rejection() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(DELETE).path("/order");
            then.status(401).body("Unauthorized/Invalid api key");
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let err = client
        .cancel_order("O1")
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("cancel should fail"))?;

    assert_eq!(err.kind(), Kind::Rejection);
    assert_eq!(err.operation(), Some("Failed to cancel order"));
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_reported_as_such() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/orders");
            then.status(200).body("<html>gateway timeout</html>");
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let err = client.get_open_orders(None).await.err();

    assert_eq!(err.map(|e| e.kind()), Some(Kind::MalformedResponse));
    Ok(())
}

#[tokio::test]
async fn unreachable_exchange_is_a_transport_error() -> anyhow::Result<()> {
    let config = Config::builder()
        .host(Url::parse("http://127.0.0.1:1")?)
        .private_key(KEY)
        .credentials(credentials())
        .policies(fixed_policies())
        .build();
    let client = TradingClient::new(config)?;

    let err = client.get_order("O1").await.err();
    assert_eq!(err.map(|e| e.kind()), Some(Kind::Transport));
    Ok(())
}

#[tokio::test]
async fn order_id_cannot_leave_the_order_path() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let derive = server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/derive-api-key");
            then.status(200).json_body(json!({
                "apiKey": "leaked",
                "secret": SECRET,
                "passphrase": "leaked",
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;

    let order = client.get_order("../../auth/derive-api-key").await?;
    assert_eq!(order, None);
    derive.assert_hits_async(0).await;

    let err = client.get_order("..").await.err();
    assert_eq!(err.map(|e| e.kind()), Some(Kind::Validation));
    Ok(())
}

#[tokio::test]
async fn cursor_cycle_fails_instead_of_looping() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .query_param("next_cursor", "MA==");
            then.status(200).json_body(json!({
                "data": [open_order("O1")],
                "next_cursor": "Mg==",
            }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .query_param("next_cursor", "Mg==");
            then.status(200).json_body(json!({
                "data": [open_order("O2")],
                "next_cursor": "MA==",
            }));
        })
        .await;

    let client = TradingClient::new(config(&server)?)?;
    let err = client.get_open_orders(None).await.err();

    assert_eq!(err.map(|e| e.kind()), Some(Kind::MalformedResponse));
    first.assert_hits_async(1).await;
    second.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn external_signer_is_resolved_before_authenticated_calls() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let wallet = PrivateKeySigner::random();
    let address = wallet.address();
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/api-key")
                .header("poly_address", address.to_checksum(None));
            then.status(200).json_body(json!({
                "apiKey": "external-key",
                "secret": SECRET,
                "passphrase": "external-phrase",
            }));
        })
        .await;
    let orders = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/orders")
                .header("poly_address", address.to_checksum(None))
                .header("poly_api_key", "external-key");
            then.status(200).json_body(json!({
                "data": [open_order("O1")],
                "next_cursor": "LTE=",
            }));
        })
        .await;

    let signer: Arc<dyn WalletSigner> = Arc::new(wallet);
    let config = Config::builder()
        .host(Url::parse(&server.base_url())?)
        .signer(signer)
        .policies(fixed_policies())
        .build();
    let client = TradingClient::new(config)?;
    assert_eq!(client.get_wallet_address(), WalletAddress::Pending);

    let open = client.get_open_orders(None).await?;

    assert_eq!(open.len(), 1);
    create.assert_async().await;
    orders.assert_async().await;
    assert_eq!(client.get_wallet_address(), WalletAddress::Ready(address));
    Ok(())
}
