//! IPAM client
//!
//! The `Ipam` capability trait the IpAddress controller allocates through,
//! plus a NetBox-backed implementation.
//!
//! # Example
//!
//! ```no_run
//! use ipam_client::{Ipam, NetBoxIpam};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ipam = NetBoxIpam::new(
//!     "http://netbox:80".to_string(),
//!     "your-api-token".to_string(),
//!     1, // prefix to allocate from
//! )?
//! .with_tags(["k8s-ipam"]);
//!
//! ipam.validate().await?;
//!
//! let address = ipam.assign("prod-default-web").await?;
//! let matches = ipam.search("prod-default-web", true).await?;
//! assert_eq!(matches, vec![address.clone()]);
//! ipam.unassign(&address).await?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod error;
pub mod models;
pub mod netbox;
#[path = "trait.rs"]
pub mod ipam_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use common::HttpClient;
pub use error::IpamError;
pub use netbox::NetBoxIpam;
pub use ipam_trait::Ipam;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockIpam, Operation};
