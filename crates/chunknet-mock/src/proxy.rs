//! Binding proxy over an in-process target.
//!
//! [`ProxyContract`] derives one callable stub per function in a capability
//! declaration and forwards each call to the identically named method of a
//! [`ContractTarget`]. Argument count and types are checked against the
//! declaration before forwarding. A target that lacks a declared method is
//! only detected when that method is called.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chunknet_oracle::binding::{BindingError, ContractBinding, ListenerId, RawListener};
use chunknet_types::abi::{DynSolType, DynSolValue, Function, JsonAbi};
use chunknet_types::Address;
use tracing::debug;

use crate::emitter::EventEmitter;

/// Failures reported by a [`ContractTarget`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The target has no method with this name.
    #[error("method {0} is not implemented")]
    NotImplemented(String),

    /// The arguments do not match what the method expects.
    #[error("invalid arguments for {method}: {reason}")]
    InvalidArguments {
        /// Method name.
        method: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// The method ran and reverted.
    #[error("{0}")]
    Reverted(String),
}

/// An in-process object that behaves like a deployed contract.
pub trait ContractTarget: Send + Sync {
    /// Run method `method` with arguments already checked against its
    /// declaration.
    fn dispatch(&self, method: &str, args: &[DynSolValue]) -> Result<DynSolValue, DispatchError>;

    /// Called when a proxy binds to this target. Events emitted through
    /// `events` reach the proxy's listeners. A later bind replaces it.
    fn attach(&self, _events: EventEmitter) {}
}

/// A [`ContractBinding`] forwarding to a [`ContractTarget`].
pub struct ProxyContract {
    address: Address,
    abi: &'static JsonAbi,
    target: Arc<dyn ContractTarget>,
    /// Declared functions keyed by full signature.
    stubs: HashMap<String, &'static Function>,
    events: EventEmitter,
}

impl ProxyContract {
    /// Bind `target` at `address` using the declaration `abi`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(address: Address, abi: &'static JsonAbi, target: Arc<dyn ContractTarget>) -> Self {
        let stubs: HashMap<String, &'static Function> =
            abi.functions().map(|f| (f.signature(), f)).collect();

        let events = EventEmitter::for_abi(abi);
        target.attach(events.clone());
        debug!(%address, functions = stubs.len(), "contract proxy bound");

        Self {
            address,
            abi,
            target,
            stubs,
            events,
        }
    }

    /// The emitter delivering this contract's events.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Resolve a bare name or full signature to its declaration.
    fn resolve(&self, function: &str) -> Result<&'static Function, BindingError> {
        if function.contains('(') {
            return self
                .stubs
                .get(function)
                .copied()
                .ok_or_else(|| BindingError::UnknownFunction(function.to_string()));
        }
        match self.abi.function(function).map(Vec::as_slice) {
            Some([decl]) => Ok(decl),
            Some([_, _, ..]) => Err(BindingError::AmbiguousFunction(function.to_string())),
            Some([]) | None => Err(BindingError::UnknownFunction(function.to_string())),
        }
    }

    /// Check each argument against its declared parameter type.
    fn check_types(decl: &Function, args: &[DynSolValue]) -> Result<(), String> {
        for (param, arg) in decl.inputs.iter().zip(args) {
            let declared = param.selector_type();
            let ty = DynSolType::parse(&declared).map_err(|e| e.to_string())?;
            if !ty.matches(arg) {
                let name = if param.name.is_empty() { "_" } else { param.name.as_str() };
                return Err(format!("{name} is not a {declared}"));
            }
        }
        Ok(())
    }

    fn invoke(&self, function: &str, args: &[DynSolValue]) -> Result<DynSolValue, BindingError> {
        let decl = self.resolve(function)?;
        let signature = decl.signature();
        if args.len() != decl.inputs.len() {
            return Err(BindingError::ArgumentCount {
                function: signature,
                expected: decl.inputs.len(),
                got: args.len(),
            });
        }
        if let Err(reason) = Self::check_types(decl, args) {
            return Err(BindingError::InvalidArguments {
                function: signature,
                reason,
            });
        }

        debug!(address = %self.address, function = %signature, "forwarding call");
        self.target
            .dispatch(&decl.name, args)
            .map_err(|e| match e {
                DispatchError::NotImplemented(_) => BindingError::NotImplemented {
                    function: signature,
                },
                DispatchError::InvalidArguments { reason, .. } => {
                    BindingError::InvalidArguments {
                        function: signature,
                        reason,
                    }
                }
                DispatchError::Reverted(reason) => BindingError::Reverted(reason),
            })
    }
}

impl ContractBinding for ProxyContract {
    fn address(&self) -> Address {
        self.address
    }

    fn call(
        &self,
        function: &str,
        args: Vec<DynSolValue>,
    ) -> impl Future<Output = Result<DynSolValue, BindingError>> + Send {
        // The target runs now; only the result is delivered asynchronously.
        std::future::ready(self.invoke(function, &args))
    }

    fn on(&self, event: &str, listener: RawListener) -> ListenerId {
        self.events.on(event, listener)
    }

    fn off(&self, event: &str, id: ListenerId) -> bool {
        self.events.off(event, id)
    }
}

#[cfg(test)]
mod tests {
    use chunknet_types::abi::{self, functions, multidata_feeds_abi};
    use chunknet_types::U256;

    use super::*;

    /// Implements only `getMetricsCount`.
    struct CountOnly;

    impl ContractTarget for CountOnly {
        fn dispatch(
            &self,
            method: &str,
            _args: &[DynSolValue],
        ) -> Result<DynSolValue, DispatchError> {
            match method {
                functions::GET_METRICS_COUNT => Ok(abi::uint256(U256::from(3u64))),
                other => Err(DispatchError::NotImplemented(other.to_string())),
            }
        }
    }

    fn proxy() -> ProxyContract {
        ProxyContract::new(
            Address::with_last_byte(1),
            multidata_feeds_abi().expect("abi"),
            Arc::new(CountOnly),
        )
    }

    #[tokio::test]
    async fn test_forwards_implemented_method() {
        let value = proxy()
            .call(functions::GET_METRICS_COUNT, Vec::new())
            .await
            .expect("count");
        assert_eq!(value, abi::uint256(U256::from(3u64)));
    }

    #[tokio::test]
    async fn test_missing_method_fails_at_call_time() {
        let proxy = proxy();
        let err = proxy
            .call(functions::GET_METRICS, Vec::new())
            .await
            .expect_err("not implemented");
        assert_eq!(
            err,
            BindingError::NotImplemented {
                function: "getMetrics()".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_overloaded_name_needs_signature() {
        let proxy = proxy();
        let err = proxy
            .call(functions::QUOTE_METRICS, vec![abi::string_array(["eth-usd"])])
            .await
            .expect_err("ambiguous");
        assert_eq!(
            err,
            BindingError::AmbiguousFunction("quoteMetrics".to_string())
        );
    }

    #[tokio::test]
    async fn test_undeclared_function() {
        let proxy = proxy();
        let err = proxy
            .call("setQuote", Vec::new())
            .await
            .expect_err("undeclared");
        assert_eq!(err, BindingError::UnknownFunction("setQuote".to_string()));

        let err = proxy
            .call("quoteMetrics(bytes32[])", vec![DynSolValue::Array(Vec::new())])
            .await
            .expect_err("undeclared overload");
        assert!(matches!(err, BindingError::UnknownFunction(_)));
    }

    #[tokio::test]
    async fn test_argument_count_checked() {
        let proxy = proxy();
        let err = proxy
            .call(functions::GET_METRIC, Vec::new())
            .await
            .expect_err("missing id");
        assert_eq!(
            err,
            BindingError::ArgumentCount {
                function: "getMetric(uint256)".to_string(),
                expected: 1,
                got: 0,
            }
        );

        let err = proxy
            .call(
                functions::GET_METRICS_COUNT,
                vec![abi::uint256(U256::from(1u64))],
            )
            .await
            .expect_err("extra arg");
        assert!(matches!(err, BindingError::ArgumentCount { got: 1, .. }));
    }

    #[tokio::test]
    async fn test_argument_types_checked() {
        let proxy = proxy();
        let err = proxy
            .call(functions::GET_METRIC, vec![abi::string("eth-usd")])
            .await
            .expect_err("string id");
        assert!(matches!(
            err,
            BindingError::InvalidArguments { ref function, .. } if function == "getMetric(uint256)"
        ));

        let err = proxy
            .call(
                functions::QUOTE_METRICS_BY_IDS,
                vec![abi::string_array(["eth-usd"])],
            )
            .await
            .expect_err("names for ids");
        assert!(matches!(err, BindingError::InvalidArguments { .. }));
    }
}
