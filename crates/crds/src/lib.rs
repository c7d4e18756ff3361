//! IPAM CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the IPAM controller.

pub mod ip_address;

pub use ip_address::*;
