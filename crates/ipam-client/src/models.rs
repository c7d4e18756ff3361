//! NetBox API models
//!
//! Only the fields the IPAM adapter reads or writes are modelled; unknown
//! fields in responses are ignored.
//! See: netbox/netbox/ipam/api/serializers_/ip.py

use serde::{Deserialize, Serialize};

/// NetBox API response wrapper (for paginated responses)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// IP Address record as returned by `/api/ipam/ip-addresses/`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IPAddress {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    pub address: String, // e.g., "192.168.1.1/24"
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vrf: Option<NestedRef>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

impl IPAddress {
    /// Address without the prefix length (`10.0.0.5/24` -> `10.0.0.5`)
    pub fn host(&self) -> &str {
        host_part(&self.address)
    }

    /// Whether this record is registered under exactly `name`.
    pub fn is_named(&self, name: &str) -> bool {
        self.description == name || self.dns_name == name || self.host() == name
    }

    /// Whether this record looks like an allocation from `prefix`.
    ///
    /// Addresses handed out by `available-ips` carry the prefix length of
    /// their prefix and live in the same VRF.
    pub fn is_allocated_from(&self, prefix: &Prefix) -> bool {
        mask_part(&self.address) == mask_part(&prefix.prefix) && self.vrf_id() == prefix.vrf_id()
    }

    /// Whether every tag in `tags` is attached to this record
    pub fn has_tags(&self, tags: &[TagRef]) -> bool {
        tags.iter().all(|tag| self.tags.iter().any(|t| t.slug == tag.slug))
    }

    pub fn vrf_id(&self) -> Option<u64> {
        self.vrf.as_ref().map(|v| v.id)
    }
}

/// Prefix record as returned by `/api/ipam/prefixes/{id}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prefix {
    pub id: u64,
    pub prefix: String, // e.g., "10.0.0.0/24"
    #[serde(default)]
    pub vrf: Option<NestedRef>,
}

impl Prefix {
    pub fn vrf_id(&self) -> Option<u64> {
        self.vrf.as_ref().map(|v| v.id)
    }
}

/// Nested object reference (only the id is read)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedRef {
    pub id: u64,
}

/// Strip a CIDR suffix from an address string.
pub fn host_part(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}

/// Prefix length of a CIDR string, `None` without one.
pub fn mask_part(address: &str) -> Option<&str> {
    address.split_once('/').map(|(_, mask)| mask)
}

/// IP address status values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IPAddressStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Dhcp,
    Slaac,
}

/// Request body for allocating the next free address in a prefix
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct AllocateIPRequest {
    pub description: String,
    pub status: IPAddressStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagRef>,
}

/// Tag reference by slug, as accepted by NetBox write serializers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRef {
    pub slug: String,
}
