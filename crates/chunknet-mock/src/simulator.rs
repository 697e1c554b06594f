//! In-memory multidata feeds contract.
//!
//! [`MockOracle`] holds the metric registry, one quote per metric and the
//! shared epoch counter. Every mutation updates state and queues its event
//! under the same lock, so no other mutation can interleave between the two.
//! Reads return copies, never views of internal state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chunknet_types::abi::{self, events, functions, DynSolValue};
use chunknet_types::metric::{HasMetric, Metric, Quote};
use chunknet_types::{metric_index, EpochId, MetricId, U256};
use tracing::{debug, info, warn};

use crate::emitter::EventEmitter;
use crate::proxy::{ContractTarget, DispatchError};
use crate::{ContractError, Result};

/// Fields of a metric being registered. Absent fields default to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricFields {
    pub name: String,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MetricFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Changes to the mutable fields of a registered metric.
///
/// Fields left as `None` keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricInfoUpdate {
    pub description: Option<String>,
    pub currency: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MetricInfoUpdate {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Default)]
struct State {
    metrics: Vec<Metric>,
    quotes: HashMap<String, Quote>,
    epoch_id: EpochId,
}

impl State {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m.name == name)
    }

    fn position(&self, id: MetricId) -> Result<usize> {
        metric_index(id)
            .filter(|&index| index < self.metrics.len())
            .ok_or(ContractError::MetricNotFound)
    }

    fn quote(&self, name: &str) -> Result<Quote> {
        self.quotes
            .get(name)
            .copied()
            .ok_or(ContractError::MetricNotFound)
    }
}

/// Simulated oracle contract.
#[derive(Default)]
pub struct MockOracle {
    state: Mutex<State>,
    events: Mutex<Option<EventEmitter>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &str, args: Vec<DynSolValue>) {
        if let Some(events) = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            if !events.emit(event, args) {
                warn!(event, "event not delivered");
            }
        }
    }

    /// Register a metric with a zero quote and emit `NewMetric`.
    ///
    /// # Errors
    ///
    /// [`ContractError::MetricExists`] if the name is taken.
    pub fn add_metric(&self, fields: MetricFields) -> Result<Metric> {
        let mut state = self.state();
        if state.quotes.contains_key(&fields.name) {
            return Err(ContractError::MetricExists(fields.name));
        }

        let metric = Metric {
            name: fields.name,
            description: fields.description.unwrap_or_default(),
            currency: fields.currency.unwrap_or_default(),
            tags: fields.tags.unwrap_or_default(),
        };
        state.metrics.push(metric.clone());
        state.quotes.insert(metric.name.clone(), Quote::default());
        info!(name = %metric.name, id = state.metrics.len() - 1, "metric registered");

        self.emit(events::NEW_METRIC, vec![abi::string(metric.name.as_str())]);
        Ok(metric)
    }

    /// Merge `updates` into metric `id` and emit `MetricInfoUpdated`.
    ///
    /// # Errors
    ///
    /// [`ContractError::MetricNotFound`] if `id` is out of range.
    pub fn update_metric_info(&self, id: MetricId, updates: MetricInfoUpdate) -> Result<()> {
        let mut state = self.state();
        let index = state.position(id)?;
        let metric = &mut state.metrics[index];
        if let Some(description) = updates.description {
            metric.description = description;
        }
        if let Some(currency) = updates.currency {
            metric.currency = currency;
        }
        if let Some(tags) = updates.tags {
            metric.tags = tags;
        }
        let name = metric.name.clone();
        info!(%name, id = index, "metric info updated");

        self.emit(events::METRIC_INFO_UPDATED, vec![abi::string(name)]);
        Ok(())
    }

    /// Replace the quote of `name`, advance the epoch and emit
    /// `MetricUpdated`. Returns the new epoch id.
    ///
    /// # Errors
    ///
    /// [`ContractError::MetricNotFound`] if `name` is not registered.
    pub fn update_quote_by_name(&self, name: &str, value: U256, update_ts: u32) -> Result<EpochId> {
        let mut state = self.state();
        let index = state.index_of(name).ok_or(ContractError::MetricNotFound)?;

        state.epoch_id += U256::from(1u64);
        let epoch_id = state.epoch_id;
        state
            .quotes
            .insert(name.to_string(), Quote::new(value, update_ts));
        debug!(name, %epoch_id, %value, update_ts, "quote updated");

        self.emit(
            events::METRIC_UPDATED,
            vec![abi::uint256(epoch_id), abi::uint256(U256::from(index))],
        );
        Ok(epoch_id)
    }

    /// Current epoch counter; zero before the first quote update.
    pub fn epoch_id(&self) -> EpochId {
        self.state().epoch_id
    }

    pub fn get_metrics(&self) -> Vec<Metric> {
        self.state().metrics.clone()
    }

    pub fn get_metrics_count(&self) -> U256 {
        U256::from(self.state().metrics.len())
    }

    pub fn get_metric(&self, id: MetricId) -> Result<Metric> {
        let state = self.state();
        let index = state.position(id)?;
        Ok(state.metrics[index].clone())
    }

    /// `id` is `0` when the metric is missing.
    pub fn has_metric(&self, name: &str) -> HasMetric {
        match self.state().index_of(name) {
            Some(index) => HasMetric::found(U256::from(index)),
            None => HasMetric::missing(),
        }
    }

    /// Quotes for `names` in order; fails as a whole on any unknown name.
    pub fn quote_metrics_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Quote>> {
        let state = self.state();
        names.iter().map(|name| state.quote(name.as_ref())).collect()
    }

    /// Quotes for `ids` in order; fails as a whole on any unknown id.
    pub fn quote_metrics_by_ids(&self, ids: &[MetricId]) -> Result<Vec<Quote>> {
        let state = self.state();
        ids.iter()
            .map(|&id| {
                let index = state.position(id)?;
                state.quote(&state.metrics[index].name)
            })
            .collect()
    }

    fn dispatch_quote_metrics(
        &self,
        keys: &DynSolValue,
    ) -> std::result::Result<DynSolValue, DispatchError> {
        let DynSolValue::Array(keys) = keys else {
            return Err(invalid(functions::QUOTE_METRICS, "expected an array"));
        };
        // The overload is chosen by element type, as on chain.
        let quotes = match keys.first() {
            None => Vec::new(),
            Some(DynSolValue::String(_)) => {
                let names = keys
                    .iter()
                    .map(abi::as_str)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| invalid(functions::QUOTE_METRICS, e))?;
                self.quote_metrics_by_names(&names)?
            }
            Some(DynSolValue::Uint(..)) => {
                let ids = keys
                    .iter()
                    .map(abi::as_uint)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| invalid(functions::QUOTE_METRICS, e))?;
                self.quote_metrics_by_ids(&ids)?
            }
            Some(other) => {
                return Err(invalid(
                    functions::QUOTE_METRICS,
                    format!("unsupported key type {}", abi::kind(other)),
                ))
            }
        };
        Ok(DynSolValue::Array(quotes.into_iter().map(Into::into).collect()))
    }
}

fn invalid(method: &str, reason: impl ToString) -> DispatchError {
    DispatchError::InvalidArguments {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

fn first_arg<'a>(
    method: &str,
    args: &'a [DynSolValue],
) -> std::result::Result<&'a DynSolValue, DispatchError> {
    args.first().ok_or_else(|| invalid(method, "missing argument"))
}

impl From<ContractError> for DispatchError {
    fn from(err: ContractError) -> Self {
        DispatchError::Reverted(err.to_string())
    }
}

impl ContractTarget for MockOracle {
    fn dispatch(
        &self,
        method: &str,
        args: &[DynSolValue],
    ) -> std::result::Result<DynSolValue, DispatchError> {
        match method {
            functions::GET_METRICS => Ok(DynSolValue::Array(
                self.get_metrics().into_iter().map(Into::into).collect(),
            )),
            functions::GET_METRICS_COUNT => Ok(abi::uint256(self.get_metrics_count())),
            functions::GET_METRIC => {
                let id = abi::as_uint(first_arg(method, args)?).map_err(|e| invalid(method, e))?;
                Ok(self.get_metric(id)?.into())
            }
            functions::HAS_METRIC => {
                let name = abi::as_str(first_arg(method, args)?).map_err(|e| invalid(method, e))?;
                Ok(self.has_metric(name).into())
            }
            functions::QUOTE_METRICS => self.dispatch_quote_metrics(first_arg(method, args)?),
            other => Err(DispatchError::NotImplemented(other.to_string())),
        }
    }

    fn attach(&self, events: EventEmitter) {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = Some(events);
    }
}
