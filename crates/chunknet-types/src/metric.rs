//! Metric registry records.
//!
//! A [`Metric`] describes one data series tracked by the oracle; its
//! [`Quote`] is the latest value and update time. Both convert to and from
//! the tuple layout declared in the contract ABI.

use serde::{Deserialize, Serialize};

use crate::abi::{self, DynSolValue};
use crate::{DecodeError, MetricId, U256};

/// A named data series in the oracle registry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Unique within the registry, never changes once assigned.
    pub name: String,
    pub description: String,
    pub currency: String,
    /// Tags in the order they were given.
    pub tags: Vec<String>,
}

/// Latest quoted value of a metric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    /// Full-width unsigned value. Never narrowed to a float.
    pub value: U256,
    /// Seconds since the Unix epoch.
    #[serde(rename = "updateTS")]
    pub update_ts: u32,
}

impl Quote {
    pub fn new(value: U256, update_ts: u32) -> Self {
        Self { value, update_ts }
    }
}

/// Result of a registry lookup by name.
///
/// `id` is `0` when `found` is `false`, which is indistinguishable from the
/// first metric's index. Prefer [`HasMetric::index`] over reading `id`
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasMetric {
    pub found: bool,
    pub id: MetricId,
}

impl HasMetric {
    pub fn found(id: MetricId) -> Self {
        Self { found: true, id }
    }

    pub fn missing() -> Self {
        Self {
            found: false,
            id: U256::ZERO,
        }
    }

    /// The registry index, only when the metric exists.
    pub fn index(&self) -> Option<MetricId> {
        self.found.then_some(self.id)
    }
}

impl From<Metric> for DynSolValue {
    fn from(metric: Metric) -> Self {
        DynSolValue::Tuple(vec![
            abi::string(metric.name),
            abi::string(metric.description),
            abi::string(metric.currency),
            abi::string_array(metric.tags),
        ])
    }
}

impl TryFrom<DynSolValue> for Metric {
    type Error = DecodeError;

    fn try_from(value: DynSolValue) -> Result<Self, Self::Error> {
        let mut fields = abi::into_tuple(value, 4)?.into_iter();
        let mut next = || {
            fields
                .next()
                .ok_or(DecodeError::FieldCount { expected: 4, found: 0 })
        };
        Ok(Self {
            name: abi::into_string(next()?)?,
            description: abi::into_string(next()?)?,
            currency: abi::into_string(next()?)?,
            tags: abi::into_array(next()?)?
                .into_iter()
                .map(abi::into_string)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<Quote> for DynSolValue {
    fn from(quote: Quote) -> Self {
        DynSolValue::Tuple(vec![
            abi::uint256(quote.value),
            DynSolValue::Uint(U256::from(quote.update_ts), 32),
        ])
    }
}

impl TryFrom<DynSolValue> for Quote {
    type Error = DecodeError;

    fn try_from(value: DynSolValue) -> Result<Self, Self::Error> {
        let fields = abi::into_tuple(value, 2)?;
        Ok(Self {
            value: abi::as_uint(&fields[0])?,
            update_ts: abi::as_u32(&fields[1])?,
        })
    }
}

impl From<HasMetric> for DynSolValue {
    fn from(has: HasMetric) -> Self {
        DynSolValue::Tuple(vec![DynSolValue::Bool(has.found), abi::uint256(has.id)])
    }
}

impl TryFrom<DynSolValue> for HasMetric {
    type Error = DecodeError;

    fn try_from(value: DynSolValue) -> Result<Self, Self::Error> {
        let fields = abi::into_tuple(value, 2)?;
        Ok(Self {
            found: abi::as_bool(&fields[0])?,
            id: abi::as_uint(&fields[1])?,
        })
    }
}
