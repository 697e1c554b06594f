//! # chunknet-types
//!
//! Shared types for the Chunknet multidata feeds oracle.
//!
//! ## Modules
//!
//! - [`metric`] - Metric and Quote records of the on-chain registry
//! - [`abi`] - Contract JSON ABI and helpers for the dynamically-typed
//!   values that cross the contract-binding boundary

pub mod abi;
pub mod metric;

pub use alloy_primitives::{Address, U256};

/// Zero-based registry index of a metric (`uint256` on the wire).
pub type MetricId = U256;

/// Value of the contract-wide quote update counter (`uint256` on the wire).
pub type EpochId = U256;

/// Errors raised when an [`abi::DynSolValue`] does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The value is of a different kind than expected.
    #[error("expected {expected}, found {found}")]
    UnexpectedKind {
        /// Kind the decoder required.
        expected: &'static str,
        /// Kind actually present.
        found: &'static str,
    },

    /// A tuple or argument list has the wrong number of fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Number of fields required.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },

    /// The bundled contract ABI could not be parsed.
    #[error("invalid contract ABI: {0}")]
    InvalidAbi(String),

    /// An unsigned integer does not fit into the narrower target type.
    #[error("value {value} does not fit in {target}")]
    Overflow {
        /// The out-of-range value.
        value: U256,
        /// Name of the target type.
        target: &'static str,
    },
}

/// Convenience result type for decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Convert a metric id into a vector index.
///
/// Returns `None` when the id cannot address any position on this platform.
pub fn metric_index(id: MetricId) -> Option<usize> {
    usize::try_from(id).ok()
}
