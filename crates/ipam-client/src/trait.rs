//! IPAM capability trait
//!
//! Allocation strategies (NetBox prefixes, external DHCP, static pools, ...)
//! plug into the controller through this trait. Implementations must be safe
//! to call concurrently; the controller shares one instance across all
//! reconciliations.

use crate::error::IpamError;

/// Operations the controller needs from an IPAM backend.
#[async_trait::async_trait]
pub trait Ipam: Send + Sync {
    /// Allocate a new address registered under `name`.
    async fn assign(&self, name: &str) -> Result<String, IpamError>;

    /// Release a previously allocated address.
    async fn unassign(&self, address: &str) -> Result<(), IpamError>;

    /// Find addresses matching `query`.
    ///
    /// With `exact` set, only records whose name equals the query (or whose
    /// address equals it) are returned.
    async fn search(&self, query: &str, exact: bool) -> Result<Vec<String>, IpamError>;
}
