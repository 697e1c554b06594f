//! Integration test: registry reads and quote lookups.
//!
//! Builds an [`OracleClient`] through the mock provider, exactly as a real
//! deployment would bind through a network provider, then:
//! 1. Reads the metric registry (list, count, by id, by name)
//! 2. Quotes metrics by name and by id and cross-checks both paths
//! 3. Verifies whole-request failure on unknown keys
//! 4. Verifies binding setup errors stay distinct from NotFound

use std::sync::Arc;

use chunknet_mock::{
    ContractTarget, DispatchError, MetricFields, MetricInfoUpdate, MockOracle, MockProvider,
};
use chunknet_oracle::binding::BindingError;
use chunknet_oracle::{OracleClient, OracleError};
use chunknet_types::abi::{self, functions, multidata_feeds_abi, DynSolValue};
use chunknet_types::metric::Quote;
use chunknet_types::{Address, U256};

const ADDRESS: &str = "0x0000000000000000000000000000000000000001";

struct Setup {
    oracle: Arc<MockOracle>,
    client: OracleClient<chunknet_mock::ProxyContract>,
}

fn setup() -> Setup {
    let provider = MockProvider::new();
    let oracle = Arc::new(MockOracle::new());
    provider.register(Address::with_last_byte(1), Arc::clone(&oracle));
    let client = OracleClient::builder()
        .provider(&provider)
        .address_str(ADDRESS)
        .build()
        .expect("client should bind to the registered simulator");
    Setup { oracle, client }
}

fn add_price_feeds(oracle: &MockOracle) {
    oracle
        .add_metric(
            MetricFields::new("eth-usd")
                .description("ETH price")
                .currency("USD")
                .tags(["price"]),
        )
        .expect("register eth-usd");
    oracle
        .add_metric(
            MetricFields::new("btc-usd")
                .description("BTC price")
                .currency("USD")
                .tags(["price"]),
        )
        .expect("register btc-usd");
}

#[tokio::test]
async fn reads_metrics_information() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let count = client.get_metrics_count().await.expect("count");
    assert_eq!(count, U256::from(2u64));

    let all = client.get_metrics().await.expect("metrics");
    assert_eq!(all[0].name, "eth-usd");
    assert_eq!(all[1].name, "btc-usd");
    assert_eq!(all[1].tags, vec!["price".to_string()]);

    let first = client.get_metric(U256::ZERO).await.expect("metric 0");
    assert_eq!(first.description, "ETH price");
    assert_eq!(first.currency, "USD");

    let second = client.get_metric(U256::from(1u64)).await.expect("metric 1");
    assert_eq!(second.name, "btc-usd");

    let has = client.has_metric("btc-usd").await.expect("has");
    assert!(has.found);
    assert_eq!(has.id, U256::from(1u64));
}

#[tokio::test]
async fn get_metric_agrees_with_listing() {
    let Setup { oracle, client } = setup();
    for name in ["eth-usd", "btc-usd", "sol-usd", "dot-usd"] {
        oracle
            .add_metric(MetricFields::new(name))
            .expect("register");
    }

    let all = client.get_metrics().await.expect("metrics");
    let count = client.get_metrics_count().await.expect("count");
    assert_eq!(U256::from(all.len()), count);

    for (i, metric) in all.iter().enumerate() {
        let by_id = client.get_metric(U256::from(i)).await.expect("by id");
        assert_eq!(by_id.name, metric.name, "index {i}");

        let has = client.has_metric(&metric.name).await.expect("has");
        assert_eq!(has.index(), Some(U256::from(i)), "name {}", metric.name);
    }
}

#[tokio::test]
async fn has_metric_miss_reports_zero_id() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let has = client.has_metric("doge-usd").await.expect("has");
    assert!(!has.found);
    // Same as eth-usd's index; only `found` tells them apart.
    assert_eq!(has.id, U256::ZERO);
    assert_eq!(has.index(), None);
}

#[tokio::test]
async fn get_metric_out_of_range_is_not_found() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let err = client
        .get_metric(U256::from(2u64))
        .await
        .expect_err("index 2 is out of range");
    assert!(matches!(err, OracleError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn quotes_metrics_by_name_and_id() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    oracle
        .update_quote_by_name("eth-usd", U256::from(2000u64), 1234)
        .expect("update eth-usd");
    oracle
        .update_quote_by_name("btc-usd", U256::from(30000u64), 1235)
        .expect("update btc-usd");

    let expected = vec![
        Quote::new(U256::from(2000u64), 1234),
        Quote::new(U256::from(30000u64), 1235),
    ];

    let by_name = client
        .quote_metrics_by_names(&["eth-usd", "btc-usd"])
        .await
        .expect("quotes by name");
    assert_eq!(by_name, expected);

    let by_id = client
        .quote_metrics_by_ids(&[U256::ZERO, U256::from(1u64)])
        .await
        .expect("quotes by id");
    assert_eq!(by_id, expected);
}

#[tokio::test]
async fn quote_order_follows_request_order() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);
    oracle
        .update_quote_by_name("eth-usd", U256::from(2000u64), 1234)
        .expect("update");

    let names = ["btc-usd", "eth-usd", "btc-usd"];
    let ids = [U256::from(1u64), U256::ZERO, U256::from(1u64)];
    let by_name = client.quote_metrics_by_names(&names).await.expect("by name");
    let by_id = client.quote_metrics_by_ids(&ids).await.expect("by id");

    assert_eq!(by_name, by_id);
    assert_eq!(by_name[0], Quote::default());
    assert_eq!(by_name[1].value, U256::from(2000u64));
}

#[tokio::test]
async fn quote_values_beyond_u64_are_lossless() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let huge = U256::from(u64::MAX) * U256::from(u64::MAX) + U256::from(7u64);
    oracle
        .update_quote_by_name("eth-usd", huge, u32::MAX)
        .expect("update");

    let quotes = client
        .quote_metrics_by_names(&["eth-usd"])
        .await
        .expect("quote");
    assert_eq!(quotes, vec![Quote::new(huge, u32::MAX)]);
}

#[tokio::test]
async fn unknown_keys_fail_the_whole_request() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let err = client
        .quote_metrics_by_names(&["eth-usd", "doge-usd"])
        .await
        .expect_err("doge-usd is unregistered");
    assert!(matches!(err, OracleError::NotFound(_)), "got {err:?}");

    let err = client
        .quote_metrics_by_ids(&[U256::ZERO, U256::from(9u64)])
        .await
        .expect_err("id 9 is out of range");
    assert!(matches!(err, OracleError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_quote_requests_return_empty() {
    let Setup { client, .. } = setup();

    let by_name = client
        .quote_metrics_by_names::<&str>(&[])
        .await
        .expect("empty by name");
    assert!(by_name.is_empty());

    let by_id = client.quote_metrics_by_ids(&[]).await.expect("empty by id");
    assert!(by_id.is_empty());
}

#[tokio::test]
async fn reads_return_snapshots() {
    let Setup { oracle, client } = setup();
    add_price_feeds(&oracle);

    let before = client.get_metric(U256::ZERO).await.expect("before");
    oracle
        .update_metric_info(U256::ZERO, MetricInfoUpdate::default().description("Ether"))
        .expect("update info");
    let after = client.get_metric(U256::ZERO).await.expect("after");

    assert_eq!(before.description, "ETH price");
    assert_eq!(after.description, "Ether");
    assert_eq!(after.name, before.name);
}

/// A deployment that only answers `getMetricsCount`.
struct PartialContract;

impl ContractTarget for PartialContract {
    fn dispatch(&self, method: &str, _args: &[DynSolValue]) -> Result<DynSolValue, DispatchError> {
        match method {
            functions::GET_METRICS_COUNT => Ok(abi::uint256(U256::ZERO)),
            other => Err(DispatchError::NotImplemented(other.to_string())),
        }
    }
}

#[tokio::test]
async fn missing_implementation_is_not_a_lookup_miss() {
    let provider = MockProvider::new();
    provider.register(Address::with_last_byte(1), Arc::new(PartialContract));
    let client = OracleClient::builder()
        .provider(&provider)
        .address(Address::with_last_byte(1))
        .build()
        .expect("client");

    assert_eq!(
        client.get_metrics_count().await.expect("count"),
        U256::ZERO
    );

    let err = client.get_metrics().await.expect_err("not implemented");
    assert!(
        matches!(err, OracleError::NotImplemented { ref function } if function == "getMetrics()"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn construction_validates_configuration() {
    let provider = MockProvider::new();

    let err = chunknet_oracle::OracleClientBuilder::<MockProvider>::new()
        .address_str(ADDRESS)
        .build()
        .err()
        .expect("missing provider");
    assert!(matches!(err, OracleError::MissingProvider));

    let err = OracleClient::builder()
        .provider(&provider)
        .build()
        .err()
        .expect("missing address");
    assert!(matches!(err, OracleError::MissingAddress));

    // Nothing deployed at the address.
    let err = OracleClient::builder()
        .provider(&provider)
        .address_str(ADDRESS)
        .build()
        .err()
        .expect("no contract");
    assert!(matches!(
        err,
        OracleError::Binding(BindingError::NoContract(_))
    ));
}

#[tokio::test]
async fn injected_contract_bypasses_provider_lookup() {
    let provider = MockProvider::new();
    let oracle = Arc::new(MockOracle::new());
    add_price_feeds(&oracle);

    // The provider has nothing registered, but the pre-built binding is used.
    let contract = chunknet_mock::ProxyContract::new(
        Address::with_last_byte(1),
        multidata_feeds_abi().expect("abi"),
        oracle,
    );
    let client = OracleClient::builder()
        .provider(&provider)
        .address_str(ADDRESS)
        .contract(contract)
        .build()
        .expect("client");

    assert_eq!(
        client.get_metrics_count().await.expect("count"),
        U256::from(2u64)
    );
}

#[test]
fn abi_export_lists_both_quote_overloads() {
    let json = serde_json::to_value(multidata_feeds_abi().expect("abi")).expect("serialize");
    let overloads: Vec<&serde_json::Value> = json
        .as_array()
        .expect("array")
        .iter()
        .filter(|entry| entry["name"] == "quoteMetrics")
        .collect();
    assert_eq!(overloads.len(), 2);
    assert_eq!(overloads[0]["inputs"][0]["type"], "string[]");
    assert_eq!(overloads[1]["inputs"][0]["type"], "uint256[]");
}
