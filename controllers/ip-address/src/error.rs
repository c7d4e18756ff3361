//! Controller-specific error types.
//!
//! This module defines error types specific to the IpAddress Controller
//! that are not covered by upstream library errors.

use ipam_client::IpamError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the IpAddress Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Misconfiguration detected at startup (bad template, missing variable)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IPAM backend assign/unassign/search failed
    #[error("IP allocation failed: {0}")]
    Allocation(String),

    /// Reference query matched zero or several addresses
    #[error("Reference resolution failed: {0}")]
    Reference(String),

    /// Address was allocated but the status write failed
    #[error("Status update failed: {0}")]
    Persistence(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// IPAM backend error outside of a reconciliation (startup validation)
    #[error("IPAM error: {0}")]
    Ipam(#[from] IpamError),

    /// Finalizer bookkeeping failed
    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<kube_runtime::finalizer::Error<ControllerError>>),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe/metrics server failed
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

impl ControllerError {
    /// Short label used for the failure metric
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Allocation(_) => "allocation",
            Self::Reference(_) => "reference",
            Self::Persistence(_) => "persistence",
            Self::Kube(_) => "kube",
            Self::Ipam(_) => "ipam",
            Self::Finalizer(_) => "finalizer",
            Self::Watch(_) => "watch",
            Self::Server(_) => "server",
        }
    }
}
