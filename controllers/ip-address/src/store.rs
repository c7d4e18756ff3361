//! Status persistence for `IpAddress` resources.
//!
//! Status writes are conditional: the patch carries the `resourceVersion`
//! the reconciler observed, so the API server rejects it with a conflict
//! when the object changed in the meantime.

use crds::{IpAddress, IpAddressStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource};
use thiserror::Error;

/// Errors returned by a status store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The observed object carries no version to condition the write on
    #[error("{0} has no resourceVersion, refusing unconditional status update")]
    MissingResourceVersion(String),

    /// The object carries no name
    #[error("object has no name")]
    MissingName,

    /// Kubernetes API error (including 409 conflicts)
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Whether the API server definitely did not apply the write.
    ///
    /// Transport failures (timeouts, resets) are ambiguous: the patch may
    /// have been committed before the connection broke.
    pub fn is_rejected(&self) -> bool {
        match self {
            Self::MissingResourceVersion(_) | Self::MissingName => true,
            Self::Kube(kube::Error::Api(response)) => (400..500).contains(&response.code),
            Self::Kube(_) => false,
        }
    }
}

/// Read-modify-write access to `IpAddress` status
#[async_trait::async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the status of `ip`, conditional on its observed version.
    async fn update_status(&self, ip: &IpAddress, status: IpAddressStatus) -> Result<IpAddress, StoreError>;
}

/// Status store backed by the Kubernetes status subresource
#[derive(Clone)]
pub struct KubeStatusStore {
    client: Client,
}

impl std::fmt::Debug for KubeStatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStatusStore").finish_non_exhaustive()
    }
}

impl KubeStatusStore {
    /// Creates a new store
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Merge patch replacing `status`, guarded by `resource_version`
pub(crate) fn conditional_status_patch(resource_version: &str, status: &IpAddressStatus) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": IpAddress::api_version(&()),
        "kind": IpAddress::kind(&()),
        "metadata": {
            "resourceVersion": resource_version,
        },
        "status": status,
    })
}

#[async_trait::async_trait]
impl StatusStore for KubeStatusStore {
    async fn update_status(&self, ip: &IpAddress, status: IpAddressStatus) -> Result<IpAddress, StoreError> {
        let name = ip.metadata.name.as_deref().ok_or(StoreError::MissingName)?;
        let resource_version = ip
            .metadata
            .resource_version
            .as_deref()
            .ok_or_else(|| StoreError::MissingResourceVersion(ip.resource_key()))?;

        let api: Api<IpAddress> = match ip.metadata.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        };

        let patch = conditional_status_patch(resource_version, &status);
        let updated = api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(updated)
    }
}
