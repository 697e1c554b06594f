//! Mock provider resolving addresses to in-process contracts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chunknet_oracle::binding::{BindingError, Provider};
use chunknet_types::abi::JsonAbi;
use chunknet_types::Address;
use tracing::debug;

use crate::proxy::{ContractTarget, ProxyContract};

type Contracts = HashMap<Address, Arc<dyn ContractTarget>>;

/// A [`Provider`] backed by an address map of [`ContractTarget`]s.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct MockProvider {
    contracts: Arc<Mutex<Contracts>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn contracts(&self) -> MutexGuard<'_, Contracts> {
        self.contracts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deploy `target` at `address`, replacing any previous deployment.
    pub fn register<T: ContractTarget + 'static>(&self, address: Address, target: Arc<T>) {
        debug!(%address, "mock contract registered");
        self.contracts().insert(address, target);
    }

    /// The target deployed at `address`, if any.
    pub fn contract(&self, address: Address) -> Option<Arc<dyn ContractTarget>> {
        self.contracts().get(&address).cloned()
    }
}

impl Provider for MockProvider {
    type Binding = ProxyContract;

    fn bind(&self, address: Address, abi: &'static JsonAbi) -> Result<ProxyContract, BindingError> {
        let target = self
            .contract(address)
            .ok_or(BindingError::NoContract(address))?;
        Ok(ProxyContract::new(address, abi, target))
    }
}
