//! Provider identity.
//!
//! Several controller instances, each backed by a different IPAM, may watch
//! the same `IpAddress` kind. Every instance stamps its identity into
//! `status.provider` and only releases addresses carrying its own stamp.

use crate::error::ControllerError;
use crds::{GROUP, IpAddress};
use regex::Regex;
use std::sync::LazyLock;

static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").expect("valid DNS label regex"));

/// Identity of this controller instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    name: String,
}

impl Provider {
    /// Create a provider identity.
    ///
    /// The name doubles as finalizer suffix, so it must be a DNS-1123 label.
    pub fn new(name: impl Into<String>) -> Result<Self, ControllerError> {
        let name = name.into();

        if !DNS_LABEL.is_match(&name) {
            return Err(ControllerError::Configuration(format!(
                "provider name '{}' must be a lowercase DNS label (a-z, 0-9, '-', at most 63 characters)",
                name
            )));
        }

        Ok(Self { name })
    }

    /// Value written to `status.provider`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finalizer guarding release of addresses assigned by this instance
    pub fn finalizer(&self) -> String {
        format!("{}/{}", GROUP, self.name)
    }

    /// Whether another provider recorded the assignment of `ip`.
    ///
    /// Resources without a recorded provider are not foreign.
    pub fn is_foreign(&self, ip: &IpAddress) -> bool {
        ip.recorded_provider().is_some_and(|p| p != self.name)
    }
}
