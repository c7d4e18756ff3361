//! Prints the IpAddress CRD manifest as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > deploy/crd.yaml`

use anyhow::Result;
use crds::IpAddress;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&IpAddress::crd())?);
    Ok(())
}
