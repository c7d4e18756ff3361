//! In-memory IPAM for unit testing
//!
//! Hands out sequential addresses from a /24 and keeps records in memory.
//! Failures can be injected per operation and every call is counted so
//! tests can assert which backend calls a reconciler made.

use crate::error::IpamError;
use crate::ipam_trait::Ipam;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend operations, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Assign,
    Unassign,
    Search,
}

#[derive(Debug, Default)]
struct State {
    /// address -> name
    records: BTreeMap<String, String>,
    next_host: u16,
    failures: HashMap<Operation, String>,
    calls: HashMap<Operation, usize>,
    released: Vec<String>,
}

/// Mock IPAM backend
#[derive(Debug, Clone)]
pub struct MockIpam {
    network: String,
    state: Arc<Mutex<State>>,
}

impl MockIpam {
    /// Create a mock handing out `<network>.1`, `<network>.2`, ...
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            state: Arc::new(Mutex::new(State {
                next_host: 1,
                ..State::default()
            })),
        }
    }

    /// Continue handing out addresses from `host` onwards
    #[must_use]
    pub fn starting_at(self, host: u16) -> Self {
        self.state().next_host = host;
        self
    }

    /// Register an existing allocation (for test setup)
    pub fn add_record(&self, address: impl Into<String>, name: impl Into<String>) {
        self.state().records.insert(address.into(), name.into());
    }

    /// Make every call of `operation` fail with `message` until cleared
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.state().failures.insert(operation, message.into());
    }

    /// Stop injecting failures for `operation`
    pub fn clear_failure(&self, operation: Operation) {
        self.state().failures.remove(&operation);
    }

    /// Number of calls made for `operation`, failed ones included
    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Name an address is registered under
    pub fn name_of(&self, address: &str) -> Option<String> {
        self.state().records.get(address).cloned()
    }

    /// Addresses released so far, in order
    pub fn released(&self) -> Vec<String> {
        self.state().released.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and return the injected failure, if any
    fn enter(&self, operation: Operation) -> Result<MutexGuard<'_, State>, IpamError> {
        let mut state = self.state();
        *state.calls.entry(operation).or_insert(0) += 1;
        if let Some(message) = state.failures.get(&operation).cloned() {
            return Err(IpamError::Api(message));
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl Ipam for MockIpam {
    async fn assign(&self, name: &str) -> Result<String, IpamError> {
        let mut state = self.enter(Operation::Assign)?;

        while state.next_host < 255 {
            let candidate = format!("{}.{}", self.network, state.next_host);
            state.next_host += 1;
            if !state.records.contains_key(&candidate) {
                state.records.insert(candidate.clone(), name.to_string());
                return Ok(candidate);
            }
        }

        Err(IpamError::Exhausted(format!("{}.0/24", self.network)))
    }

    async fn unassign(&self, address: &str) -> Result<(), IpamError> {
        let mut state = self.enter(Operation::Unassign)?;

        match state.records.remove(address) {
            Some(_) => {
                state.released.push(address.to_string());
                Ok(())
            }
            None => Err(IpamError::NotFound(format!("address {} is not registered", address))),
        }
    }

    async fn search(&self, query: &str, exact: bool) -> Result<Vec<String>, IpamError> {
        let state = self.enter(Operation::Search)?;

        Ok(state
            .records
            .iter()
            .filter(|(address, name)| {
                if exact {
                    name.as_str() == query || address.as_str() == query
                } else {
                    name.contains(query) || address.contains(query)
                }
            })
            .map(|(address, _)| address.clone())
            .collect())
    }
}
