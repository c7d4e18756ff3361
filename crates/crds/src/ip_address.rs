//! IpAddress CRD
//!
//! Requests an IP address from the IPAM backend, either freshly allocated
//! or borrowed from an existing allocation by reference.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group shared by all IPAM resources.
pub const GROUP: &str = "ipam.nexinto.com";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "ipam.nexinto.com",
    version = "v1",
    kind = "IpAddress",
    plural = "ipaddresses",
    shortname = "ip",
    namespaced,
    status = "IpAddressStatus",
    printcolumn = r#"{"name":"Address","type":"string","jsonPath":".status.address"}"#,
    printcolumn = r#"{"name":"Name","type":"string","jsonPath":".status.name"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".status.provider"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressSpec {
    /// Explicit name used in the IPAM backend.
    /// When empty, the controller derives one from its name template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Query identifying an existing address to borrow instead of allocating.
    /// Borrowed addresses are never released by this resource.
    #[serde(default, rename = "ref", skip_serializing_if = "String::is_empty")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressStatus {
    /// Assigned address, empty until assignment succeeded
    #[serde(default)]
    pub address: String,

    /// Name the address was registered under
    #[serde(default)]
    pub name: String,

    /// Identity of the controller instance that performed the assignment
    #[serde(default)]
    pub provider: String,
}

impl IpAddress {
    /// `namespace/name` key used in logs and metrics.
    pub fn resource_key(&self) -> String {
        format!(
            "{}/{}",
            self.metadata.namespace.as_deref().unwrap_or("default"),
            self.metadata.name.as_deref().unwrap_or("<unknown>")
        )
    }

    /// Address recorded in status, if any.
    pub fn assigned_address(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.address.as_str())
            .filter(|a| !a.is_empty())
    }

    /// Provider recorded in status, if any.
    pub fn recorded_provider(&self) -> Option<&str> {
        self.status
            .as_ref()
            .map(|s| s.provider.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Whether the address is borrowed from another allocation.
    pub fn is_reference(&self) -> bool {
        !self.spec.reference.is_empty()
    }
}
