//! Contract capability declaration for the multidata feeds oracle.
//!
//! The declaration is the contract's JSON ABI, bundled as a static artifact
//! and parsed once into a [`JsonAbi`]. Bindings derive their callable stubs
//! from it; overloads are told apart by [`Function::signature`].
//!
//! Values crossing the binding boundary are [`DynSolValue`]s. The helpers
//! below build the few shapes this contract uses and read them back with a
//! [`DecodeError`] instead of an `Option`.

use std::sync::LazyLock;

pub use alloy_core::dyn_abi::{DynSolType, DynSolValue};
pub use alloy_core::json_abi::{Event, Function, JsonAbi};

use crate::{DecodeError, Result, U256};

/// Function names and full signatures of the oracle contract.
pub mod functions {
    pub const GET_METRICS: &str = "getMetrics";
    pub const GET_METRICS_COUNT: &str = "getMetricsCount";
    pub const GET_METRIC: &str = "getMetric";
    pub const HAS_METRIC: &str = "hasMetric";
    /// Overloaded: resolve through one of the two signatures below.
    pub const QUOTE_METRICS: &str = "quoteMetrics";
    pub const QUOTE_METRICS_BY_NAMES: &str = "quoteMetrics(string[])";
    pub const QUOTE_METRICS_BY_IDS: &str = "quoteMetrics(uint256[])";
}

/// Event names emitted by the oracle contract.
pub mod events {
    pub const NEW_METRIC: &str = "NewMetric";
    pub const METRIC_INFO_UPDATED: &str = "MetricInfoUpdated";
    pub const METRIC_UPDATED: &str = "MetricUpdated";
}

/// JSON ABI of the multidata feeds reader contract.
pub const MULTIDATA_FEEDS_JSON: &str = include_str!("../abi/MultidataFeedsReader.json");

static MULTIDATA_FEEDS_ABI: LazyLock<std::result::Result<JsonAbi, String>> =
    LazyLock::new(|| serde_json::from_str(MULTIDATA_FEEDS_JSON).map_err(|e| e.to_string()));

/// The parsed declaration of the multidata feeds reader contract.
///
/// # Errors
///
/// [`DecodeError::InvalidAbi`] if the bundled JSON does not parse.
pub fn multidata_feeds_abi() -> Result<&'static JsonAbi> {
    MULTIDATA_FEEDS_ABI
        .as_ref()
        .map_err(|reason| DecodeError::InvalidAbi(reason.clone()))
}

/// Short name of the value kind, used in decode errors.
pub fn kind(value: &DynSolValue) -> &'static str {
    match value {
        DynSolValue::Bool(_) => "bool",
        DynSolValue::Int(..) => "int",
        DynSolValue::Uint(..) => "uint",
        DynSolValue::FixedBytes(..) => "fixed bytes",
        DynSolValue::Address(_) => "address",
        DynSolValue::Bytes(_) => "bytes",
        DynSolValue::String(_) => "string",
        DynSolValue::Array(_) | DynSolValue::FixedArray(_) => "array",
        DynSolValue::Tuple(_) => "tuple",
        _ => "other",
    }
}

fn unexpected(expected: &'static str, found: &DynSolValue) -> DecodeError {
    DecodeError::UnexpectedKind {
        expected,
        found: kind(found),
    }
}

/// A `uint256` value.
pub fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

pub fn string(value: impl Into<String>) -> DynSolValue {
    DynSolValue::String(value.into())
}

/// A `string[]` value.
pub fn string_array<I, S>(items: I) -> DynSolValue
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    DynSolValue::Array(items.into_iter().map(string).collect())
}

/// A `uint256[]` value.
pub fn uint256_array(items: impl IntoIterator<Item = U256>) -> DynSolValue {
    DynSolValue::Array(items.into_iter().map(uint256).collect())
}

pub fn as_bool(value: &DynSolValue) -> Result<bool> {
    match value {
        DynSolValue::Bool(b) => Ok(*b),
        other => Err(unexpected("bool", other)),
    }
}

/// Read an unsigned integer of any width.
pub fn as_uint(value: &DynSolValue) -> Result<U256> {
    match value {
        DynSolValue::Uint(v, _) => Ok(*v),
        other => Err(unexpected("uint", other)),
    }
}

/// Read a `uint32` field, rejecting values that would be truncated.
pub fn as_u32(value: &DynSolValue) -> Result<u32> {
    let value = as_uint(value)?;
    u32::try_from(value).map_err(|_| DecodeError::Overflow {
        value,
        target: "uint32",
    })
}

pub fn as_str(value: &DynSolValue) -> Result<&str> {
    match value {
        DynSolValue::String(s) => Ok(s),
        other => Err(unexpected("string", other)),
    }
}

pub fn into_string(value: DynSolValue) -> Result<String> {
    match value {
        DynSolValue::String(s) => Ok(s),
        other => Err(unexpected("string", &other)),
    }
}

pub fn into_array(value: DynSolValue) -> Result<Vec<DynSolValue>> {
    match value {
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Ok(items),
        other => Err(unexpected("array", &other)),
    }
}

/// Unwrap a tuple and check its arity.
pub fn into_tuple(value: DynSolValue, arity: usize) -> Result<Vec<DynSolValue>> {
    match value {
        DynSolValue::Tuple(fields) if fields.len() == arity => Ok(fields),
        DynSolValue::Tuple(fields) => Err(DecodeError::FieldCount {
            expected: arity,
            found: fields.len(),
        }),
        other => Err(unexpected("tuple", &other)),
    }
}

/// Decode an array value element by element.
pub fn decode_array<T>(value: DynSolValue) -> Result<Vec<T>>
where
    T: TryFrom<DynSolValue, Error = DecodeError>,
{
    into_array(value)?.into_iter().map(T::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi() -> &'static JsonAbi {
        multidata_feeds_abi().expect("bundled ABI parses")
    }

    #[test]
    fn test_declares_all_functions_and_events() {
        assert_eq!(abi().functions().count(), 6);
        assert_eq!(abi().events().count(), 3);
        for name in [events::NEW_METRIC, events::METRIC_INFO_UPDATED, events::METRIC_UPDATED] {
            assert!(abi().event(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_quote_metrics_is_overloaded() {
        let overloads: Vec<String> = abi()
            .function(functions::QUOTE_METRICS)
            .expect("declared")
            .iter()
            .map(Function::signature)
            .collect();
        assert_eq!(
            overloads,
            vec![
                functions::QUOTE_METRICS_BY_NAMES.to_string(),
                functions::QUOTE_METRICS_BY_IDS.to_string(),
            ]
        );
    }

    #[test]
    fn test_event_signature() {
        let updated = &abi().event(events::METRIC_UPDATED).expect("declared")[0];
        assert_eq!(updated.signature(), "MetricUpdated(uint256,uint256)");
        assert!(updated.inputs.iter().all(|p| p.indexed));
    }

    #[test]
    fn test_input_types_resolve() {
        let by_ids = abi()
            .functions()
            .find(|f| f.signature() == functions::QUOTE_METRICS_BY_IDS)
            .expect("declared");
        let ty = DynSolType::parse(&by_ids.inputs[0].selector_type()).expect("type");
        assert!(ty.matches(&uint256_array([U256::from(1u64)])));
        assert!(!ty.matches(&string_array(["eth-usd"])));
    }

    #[test]
    fn test_as_u32_rejects_overflow() {
        let ok = uint256(U256::from(u32::MAX));
        assert_eq!(as_u32(&ok).expect("fits"), u32::MAX);

        let too_big = uint256(U256::from(u64::from(u32::MAX) + 1));
        assert!(matches!(
            as_u32(&too_big),
            Err(DecodeError::Overflow { target: "uint32", .. })
        ));
    }

    #[test]
    fn test_into_tuple_checks_arity() {
        let value = DynSolValue::Tuple(vec![DynSolValue::Bool(true)]);
        assert_eq!(
            into_tuple(value, 2),
            Err(DecodeError::FieldCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            into_tuple(string("x"), 1),
            Err(DecodeError::UnexpectedKind {
                expected: "tuple",
                found: "string"
            })
        );
    }
}
