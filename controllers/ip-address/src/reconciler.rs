//! Reconciliation logic for IpAddress CRDs.
//!
//! On create or update an `IpAddress` either receives a freshly allocated
//! address or borrows an existing one found by its `ref` query. On delete
//! the address is released, unless it was borrowed or another provider
//! assigned it.
//!
//! Every failure is logged, reported as a Warning event on the resource
//! and returned so the caller can retry.

use crate::error::ControllerError;
use crate::events::{EventReporter, EventSeverity};
use crate::metrics::{self, AssignmentSource};
use crate::naming::NameResolver;
use crate::provider::Provider;
use crate::store::StatusStore;
use crds::{IpAddress, IpAddressStatus};
use ipam_client::{Ipam, IpamError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reconciles `IpAddress` resources against an IPAM backend.
pub struct Reconciler {
    ipam: Arc<dyn Ipam>,
    store: Arc<dyn StatusStore>,
    events: Arc<dyn EventReporter>,
    names: NameResolver,
    provider: Provider,
    release_on_persist_failure: bool,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("names", &self.names)
            .field("provider", &self.provider)
            .field("release_on_persist_failure", &self.release_on_persist_failure)
            .finish_non_exhaustive()
    }
}

/// `namespace-name` label used in user-facing messages
fn object_label(ip: &IpAddress) -> String {
    format!(
        "{}-{}",
        ip.metadata.namespace.as_deref().unwrap_or_default(),
        ip.metadata.name.as_deref().unwrap_or_default()
    )
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        ipam: Arc<dyn Ipam>,
        store: Arc<dyn StatusStore>,
        events: Arc<dyn EventReporter>,
        names: NameResolver,
        provider: Provider,
    ) -> Self {
        Self {
            ipam,
            store,
            events,
            names,
            provider,
            release_on_persist_failure: true,
        }
    }

    /// Whether a fresh allocation is handed back when its status write fails
    #[must_use]
    pub fn with_release_on_persist_failure(mut self, enabled: bool) -> Self {
        self.release_on_persist_failure = enabled;
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Handles a created or updated `IpAddress`.
    ///
    /// This method:
    /// 1. Returns early when an address is already recorded
    /// 2. Resolves the name the address is registered under
    /// 3. Allocates a new address, or resolves `spec.ref` to exactly one existing address
    /// 4. Records address, name and provider in the status
    pub async fn on_created_or_updated(&self, ip: &IpAddress) -> Result<(), ControllerError> {
        let key = ip.resource_key();

        if let Some(address) = ip.assigned_address() {
            debug!("IpAddress {} already has address {}", key, address);
            return Ok(());
        }

        let name = self.names.name_for(ip);
        let label = object_label(ip);

        let (address, source) = if ip.is_reference() {
            (self.resolve_reference(ip, &label).await?, AssignmentSource::Reference)
        } else {
            match self.ipam.assign(&name).await {
                Ok(address) => (address, AssignmentSource::Allocated),
                Err(e) => {
                    let message = format!("could not assign new address for '{}': {}", label, e);
                    return Err(self.fail(ip, ControllerError::Allocation, message).await);
                }
            }
        };

        let status = IpAddressStatus {
            address: address.clone(),
            name: name.clone(),
            provider: self.provider.name().to_string(),
        };

        if let Err(e) = self.store.update_status(ip, status).await {
            let message = format!(
                "assigned address {} for '{}', but could not update object: {}",
                address, label, e
            );
            let err = self.fail(ip, ControllerError::Persistence, message).await;

            if source == AssignmentSource::Allocated && self.release_on_persist_failure {
                if e.is_rejected() {
                    self.release_unrecorded(&key, &address).await;
                } else {
                    warn!(
                        "Status write for IpAddress {} may have been applied, keeping address {} (possibly orphaned in IPAM)",
                        key, address
                    );
                }
            }
            return Err(err);
        }

        info!(
            "Assigned address {} to IpAddress {} as '{}' ({})",
            address,
            key,
            name,
            source.as_str()
        );
        metrics::record_assignment(source);
        self.notify(ip, &format!("assigned address {} as '{}'", address, name))
            .await;

        Ok(())
    }

    /// Handles a deleted `IpAddress`.
    ///
    /// Releases the recorded address unless another provider assigned it,
    /// nothing was assigned, or the address is borrowed by reference.
    pub async fn on_deleted(&self, ip: &IpAddress) -> Result<(), ControllerError> {
        let key = ip.resource_key();

        if self.provider.is_foreign(ip) {
            debug!(
                "IpAddress {} was assigned by provider '{}', not releasing",
                key,
                ip.recorded_provider().unwrap_or_default()
            );
            return Ok(());
        }

        let Some(address) = ip.assigned_address() else {
            debug!("IpAddress {} has no address, nothing to release", key);
            return Ok(());
        };

        if ip.is_reference() {
            debug!(
                "IpAddress {} borrows {} via '{}', not releasing",
                key, address, ip.spec.reference
            );
            return Ok(());
        }

        match self.ipam.unassign(address).await {
            Ok(()) => {}
            Err(IpamError::NotFound(e)) => {
                warn!("Address {} of IpAddress {} is already gone from IPAM: {}", address, key, e);
            }
            Err(e) => {
                let message = format!(
                    "could not unassign address {} for '{}' from IPAM: {}",
                    address,
                    object_label(ip),
                    e
                );
                return Err(self.fail(ip, ControllerError::Allocation, message).await);
            }
        }

        info!("Released address {} of IpAddress {}", address, key);
        debug!("Resources borrowing {} keep their recorded address", address);
        metrics::record_release();

        Ok(())
    }

    /// Finds the single existing address matching `spec.ref`
    async fn resolve_reference(&self, ip: &IpAddress, label: &str) -> Result<String, ControllerError> {
        let query = ip.spec.reference.as_str();

        let mut found = match self.ipam.search(query, true).await {
            Ok(found) => found,
            Err(e) => {
                let message = format!(
                    "error searching for address matching '{}' for '{}': {}",
                    query, label, e
                );
                return Err(self.fail(ip, ControllerError::Allocation, message).await);
            }
        };

        match found.len() {
            1 => Ok(found.remove(0)),
            0 => {
                let message = format!("did not find address matching '{}' for '{}'", query, label);
                Err(self.fail(ip, ControllerError::Reference, message).await)
            }
            n => {
                let message = format!(
                    "found {} addresses matching '{}' for '{}', need exactly one",
                    n, query, label
                );
                Err(self.fail(ip, ControllerError::Reference, message).await)
            }
        }
    }

    /// Hands back an allocation whose status write failed.
    ///
    /// Errors are only logged; the original failure is what gets reported.
    async fn release_unrecorded(&self, key: &str, address: &str) {
        match self.ipam.unassign(address).await {
            Ok(()) => info!("Released unrecorded address {} of IpAddress {}", address, key),
            Err(e) => warn!(
                "Could not release unrecorded address {} of IpAddress {}, it is orphaned in IPAM: {}",
                address, key, e
            ),
        }
    }

    /// Logs `message`, reports it as a Warning event and wraps it in an error.
    async fn fail(
        &self,
        ip: &IpAddress,
        kind: fn(String) -> ControllerError,
        message: String,
    ) -> ControllerError {
        error!("{}", message);
        if let Err(e) = self.events.emit(ip, &message, EventSeverity::Warning).await {
            warn!("Failed to record event for IpAddress {}: {}", ip.resource_key(), e);
        }
        kind(message)
    }

    async fn notify(&self, ip: &IpAddress, message: &str) {
        if let Err(e) = self.events.emit(ip, message, EventSeverity::Normal).await {
            warn!("Failed to record event for IpAddress {}: {}", ip.resource_key(), e);
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
