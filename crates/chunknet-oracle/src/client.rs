//! The oracle client.
//!
//! [`OracleClient`] wraps one [`ContractBinding`] bound to one address and
//! exposes typed reads over the metric registry and quote store, plus typed
//! event subscriptions. It holds no mutable state: every read goes to the
//! binding, and nothing is cached or retried.

use std::str::FromStr;
use std::sync::Arc;

use chunknet_types::abi::{self, events, functions, DynSolValue, JsonAbi};
use chunknet_types::metric::{HasMetric, Metric, Quote};
use chunknet_types::{Address, DecodeError, EpochId, MetricId, U256};
use tracing::{debug, warn};

use crate::binding::{ContractBinding, Provider, RawListener};
use crate::config::ClientConfig;
use crate::subscription::{decode_metric_updated, decode_name, Subscription};
use crate::{OracleError, Result};

/// Typed client for the multidata feeds oracle contract.
pub struct OracleClient<B> {
    address: Address,
    abi: &'static JsonAbi,
    contract: Arc<B>,
}

impl<B: ContractBinding + 'static> OracleClient<B> {
    /// Start building a client whose binding comes from provider `P`.
    pub fn builder<'a, P>() -> OracleClientBuilder<'a, P>
    where
        P: Provider<Binding = B>,
    {
        OracleClientBuilder::new()
    }

    /// Address of the oracle contract.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Capability declaration the binding was built from.
    pub fn abi(&self) -> &'static JsonAbi {
        self.abi
    }

    /// The underlying binding.
    pub fn contract(&self) -> &B {
        &self.contract
    }

    async fn call(&self, function: &'static str, args: Vec<DynSolValue>) -> Result<DynSolValue> {
        debug!(address = %self.address, function, "calling oracle contract");
        Ok(self.contract.call(function, args).await?)
    }

    /// All registered metrics in registry order.
    pub async fn get_metrics(&self) -> Result<Vec<Metric>> {
        let value = self.call(functions::GET_METRICS, Vec::new()).await?;
        Ok(abi::decode_array(value)?)
    }

    /// Number of registered metrics.
    pub async fn get_metrics_count(&self) -> Result<U256> {
        let value = self.call(functions::GET_METRICS_COUNT, Vec::new()).await?;
        Ok(abi::as_uint(&value)?)
    }

    /// The metric at registry index `id`.
    ///
    /// # Errors
    ///
    /// [`OracleError::NotFound`] if `id` is out of range.
    pub async fn get_metric(&self, id: MetricId) -> Result<Metric> {
        let value = self
            .call(functions::GET_METRIC, vec![abi::uint256(id)])
            .await?;
        Ok(Metric::try_from(value)?)
    }

    /// Look a metric up by name.
    ///
    /// When the metric is missing the returned `id` is `0`, the same as the
    /// first metric's index. Check `found` (or use [`HasMetric::index`])
    /// before trusting `id`.
    pub async fn has_metric(&self, name: &str) -> Result<HasMetric> {
        let value = self
            .call(functions::HAS_METRIC, vec![abi::string(name)])
            .await?;
        Ok(HasMetric::try_from(value)?)
    }

    /// Quotes for `names`, in the same order.
    ///
    /// # Errors
    ///
    /// [`OracleError::NotFound`] if any name is unregistered. No partial
    /// result is returned.
    pub async fn quote_metrics_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Quote>> {
        let keys = abi::string_array(names.iter().map(AsRef::<str>::as_ref));
        let value = self
            .call(functions::QUOTE_METRICS_BY_NAMES, vec![keys])
            .await?;
        Ok(abi::decode_array(value)?)
    }

    /// Quotes for registry indices `ids`, in the same order.
    ///
    /// # Errors
    ///
    /// [`OracleError::NotFound`] if any id is out of range. No partial
    /// result is returned.
    pub async fn quote_metrics_by_ids(&self, ids: &[MetricId]) -> Result<Vec<Quote>> {
        let keys = abi::uint256_array(ids.iter().copied());
        let value = self
            .call(functions::QUOTE_METRICS_BY_IDS, vec![keys])
            .await?;
        Ok(abi::decode_array(value)?)
    }

    /// Call `listener` with the name of every newly registered metric.
    pub fn on_new_metric<F>(&self, listener: F) -> Subscription
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.subscribe(events::NEW_METRIC, move |args| {
            listener(decode_name(args)?);
            Ok(())
        })
    }

    /// Call `listener` with the name of a metric whose description, currency
    /// or tags changed.
    pub fn on_metric_info_updated<F>(&self, listener: F) -> Subscription
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.subscribe(events::METRIC_INFO_UPDATED, move |args| {
            listener(decode_name(args)?);
            Ok(())
        })
    }

    /// Call `listener` with `(epoch_id, metric_id)` on every quote update.
    /// `metric_id` is the registry index, not the name.
    pub fn on_metric_updated<F>(&self, listener: F) -> Subscription
    where
        F: Fn(EpochId, MetricId) + Send + Sync + 'static,
    {
        self.subscribe(events::METRIC_UPDATED, move |args| {
            let (epoch_id, metric_id) = decode_metric_updated(args)?;
            listener(epoch_id, metric_id);
            Ok(())
        })
    }

    fn subscribe<F>(&self, event: &'static str, handler: F) -> Subscription
    where
        F: Fn(&[DynSolValue]) -> std::result::Result<(), DecodeError> + Send + Sync + 'static,
    {
        let raw: RawListener = Arc::new(move |args: &[DynSolValue]| {
            if let Err(e) = handler(args) {
                warn!(event, error = %e, "dropping undecodable notification");
            }
        });
        let id = self.contract.on(event, raw);
        debug!(address = %self.address, event, listener = id, "subscribed");

        let contract = Arc::clone(&self.contract);
        Subscription::new(event, move || {
            let removed = contract.off(event, id);
            debug!(event, listener = id, removed, "unsubscribed");
            removed
        })
    }
}

/// Builder for [`OracleClient`].
///
/// A provider and an address are mandatory; [`build`](Self::build) fails
/// immediately when either is missing.
pub struct OracleClientBuilder<'a, P: Provider> {
    provider: Option<&'a P>,
    address: Option<Address>,
    address_hex: Option<String>,
    contract: Option<P::Binding>,
}

impl<'a, P: Provider> OracleClientBuilder<'a, P> {
    pub fn new() -> Self {
        Self {
            provider: None,
            address: None,
            address_hex: None,
            contract: None,
        }
    }

    pub fn provider(mut self, provider: &'a P) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Contract address as a hex string, parsed in [`build`](Self::build).
    pub fn address_str(mut self, address: impl Into<String>) -> Self {
        self.address_hex = Some(address.into());
        self
    }

    /// Apply a [`ClientConfig`]. Values already set on the builder win.
    pub fn config(mut self, config: &ClientConfig) -> Self {
        if self.address_hex.is_none() {
            self.address_hex = config.contract_address.clone();
        }
        self
    }

    /// Use a pre-built binding instead of asking the provider for one.
    pub fn contract(mut self, contract: P::Binding) -> Self {
        self.contract = Some(contract);
        self
    }

    fn resolve_address(&self) -> Result<Address> {
        if let Some(address) = self.address {
            return Ok(address);
        }
        match self.address_hex.as_deref().map(str::trim) {
            None | Some("") => Err(OracleError::MissingAddress),
            Some(hex) => Address::from_str(hex).map_err(|e| OracleError::InvalidAddress {
                address: hex.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Validate the configuration and bind the contract.
    ///
    /// # Errors
    ///
    /// - [`OracleError::MissingProvider`] / [`OracleError::MissingAddress`]
    /// - [`OracleError::InvalidAddress`] for a malformed hex address
    /// - any binding error the provider raises while binding
    pub fn build(self) -> Result<OracleClient<P::Binding>> {
        let provider = self.provider.ok_or(OracleError::MissingProvider)?;
        let address = self.resolve_address()?;
        let abi = abi::multidata_feeds_abi()?;

        let contract = match self.contract {
            Some(contract) => contract,
            None => provider.bind(address, abi)?,
        };
        debug!(%address, "oracle client bound");

        Ok(OracleClient {
            address,
            abi,
            contract: Arc::new(contract),
        })
    }
}

impl<P: Provider> Default for OracleClientBuilder<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}
