//! Contract binding layer.
//!
//! A [`ContractBinding`] is the object through which calls are issued and
//! events are observed for one contract address. A [`Provider`] resolves an
//! address plus a capability declaration into a binding.
//!
//! The oracle client never encodes calls or talks to a network itself; it
//! only needs, per declared function, an async callable and, per event name,
//! an on/off pair. Real transports and the in-memory simulator in
//! `chunknet-mock` both implement these traits.

use std::future::Future;
use std::sync::Arc;

use chunknet_types::abi::{DynSolValue, JsonAbi};
use chunknet_types::Address;

/// Identifies one registered listener within a binding.
pub type ListenerId = u64;

/// A listener receiving the raw argument list of an event.
pub type RawListener = Arc<dyn Fn(&[DynSolValue]) + Send + Sync>;

/// Errors raised by a contract binding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// The target behind the binding has no implementation for a declared
    /// function. This is a setup bug, not a lookup miss.
    #[error("function {function} is not implemented on the bound contract")]
    NotImplemented {
        /// Signature of the function.
        function: String,
    },

    /// The function is not part of the capability declaration.
    #[error("function {0} is not declared in the contract ABI")]
    UnknownFunction(String),

    /// A bare function name matches several overloads.
    #[error("function {0} is overloaded, call it by full signature")]
    AmbiguousFunction(String),

    /// Wrong number of arguments for the declared inputs.
    #[error("{function} expects {expected} arguments, got {got}")]
    ArgumentCount {
        /// Signature of the function.
        function: String,
        /// Declared input count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// Arguments could not be interpreted by the target.
    #[error("invalid arguments for {function}: {reason}")]
    InvalidArguments {
        /// Signature of the function.
        function: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// The contract reverted the call.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Nothing is deployed at the requested address.
    #[error("no contract deployed at {0}")]
    NoContract(Address),

    /// Network or provider failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A callable, observable contract bound to one address.
pub trait ContractBinding: Send + Sync {
    /// The address this binding talks to.
    fn address(&self) -> Address;

    /// Call a declared function.
    ///
    /// `function` is either a bare name or, for overloaded functions, the
    /// full signature such as `quoteMetrics(uint256[])`.
    fn call(
        &self,
        function: &str,
        args: Vec<DynSolValue>,
    ) -> impl Future<Output = std::result::Result<DynSolValue, BindingError>> + Send;

    /// Register a listener for an event name.
    fn on(&self, event: &str, listener: RawListener) -> ListenerId;

    /// Remove one listener. Returns `false` if it was not registered.
    fn off(&self, event: &str, id: ListenerId) -> bool;
}

/// Resolves contract addresses into bindings.
pub trait Provider {
    /// The binding type this provider produces.
    type Binding: ContractBinding;

    /// Bind `address` against the capability declaration `abi`.
    fn bind(
        &self,
        address: Address,
        abi: &'static JsonAbi,
    ) -> std::result::Result<Self::Binding, BindingError>;
}
