//! # chunknet-mock
//!
//! In-memory stand-ins for the oracle contract and its transport, used to
//! exercise [`chunknet_oracle::OracleClient`] without a network.
//!
//! ## Modules
//!
//! - [`simulator`] - [`MockOracle`], the registry/quote state machine
//! - [`proxy`] - [`ProxyContract`], a binding deriving callables from the ABI
//! - [`emitter`] - [`EventEmitter`], asynchronous per-event listener dispatch
//! - [`provider`] - [`MockProvider`], address to simulator resolution

pub mod emitter;
pub mod provider;
pub mod proxy;
pub mod simulator;

pub use emitter::EventEmitter;
pub use provider::MockProvider;
pub use proxy::{ContractTarget, DispatchError, ProxyContract};
pub use simulator::{MetricFields, MetricInfoUpdate, MockOracle};

/// Failures of simulated contract operations.
///
/// The display text doubles as the revert reason seen by bindings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    /// No metric with the given id or name.
    #[error("Metric not found")]
    MetricNotFound,

    /// A metric with this name is already registered.
    #[error("Metric already exists: {0}")]
    MetricExists(String),
}

/// Convenience result type for simulator operations.
pub type Result<T> = std::result::Result<T, ContractError>;
