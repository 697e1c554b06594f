//! chunknet-watch: seeds an in-memory multidata feeds oracle and logs every
//! notification the oracle client receives.
//!
//! The simulator is deployed on a mock provider at the configured address,
//! the client binds to it exactly as it would to a live contract, and the
//! configured seed metrics drive the three contract events.

mod config;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chunknet_mock::{MetricFields, MockOracle, MockProvider};
use chunknet_oracle::OracleClient;
use chunknet_types::Address;
use tracing::{info, warn};

use crate::config::WatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = WatchConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("chunknet={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("chunknet-watch starting");

    // 2. Deploy the simulator
    let address = Address::from_str(config.contract_address())
        .with_context(|| format!("invalid contract address {}", config.contract_address()))?;
    let provider = MockProvider::new();
    let oracle = Arc::new(MockOracle::new());
    provider.register(address, Arc::clone(&oracle));

    // 3. Bind the client
    let client = OracleClient::builder()
        .provider(&provider)
        .address(address)
        .config(&config.oracle)
        .build()?;
    info!(%address, "oracle client bound");

    // 4. Subscribe to every contract event
    let subscriptions = [
        client.on_new_metric(|name| info!(%name, "NewMetric")),
        client.on_metric_info_updated(|name| info!(%name, "MetricInfoUpdated")),
        client.on_metric_updated(|epoch_id, metric_id| {
            info!(%epoch_id, %metric_id, "MetricUpdated")
        }),
    ];

    // 5. Seed metrics and quotes
    for seed in &config.seeds {
        let fields = MetricFields::new(seed.name.as_str())
            .description(seed.description.as_str())
            .currency(seed.currency.as_str())
            .tags(seed.tags.iter().map(String::as_str));
        if let Err(e) = oracle.add_metric(fields) {
            warn!(name = %seed.name, error = %e, "skipping seed metric");
            continue;
        }
        if let Some(value) = seed.quote_value()? {
            oracle.update_quote_by_name(&seed.name, value, seed.update_ts)?;
        }
    }

    // Deliver everything emitted while seeding
    client.contract().events().flush().await;

    // 6. Snapshot through the client
    let metrics = client.get_metrics().await?;
    let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
    let quotes = client.quote_metrics_by_names(&names).await?;
    info!(
        count = %client.get_metrics_count().await?,
        epoch_id = %oracle.epoch_id(),
        "registry snapshot"
    );
    for (metric, quote) in metrics.iter().zip(&quotes) {
        info!(
            name = %metric.name,
            currency = %metric.currency,
            value = %quote.value,
            update_ts = quote.update_ts,
            "quote"
        );
    }

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }

    info!("chunknet-watch stopped");
    Ok(())
}
