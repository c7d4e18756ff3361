//! IpAddress Controller
//!
//! Assigns IP addresses to `IpAddress` resources from an IPAM backend
//! (NetBox), either as fresh allocations or by reference to an existing
//! allocation, and releases owned addresses when resources are deleted.

mod backoff;
mod config;
mod controller;
mod error;
mod events;
mod metrics;
mod naming;
mod provider;
mod reconciler;
mod server;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    info!("Starting IpAddress Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Provider: {}", config.provider.name());
    info!("  Tag: {}", config.tag);
    info!("  Name template: {}", config.name_template.source());
    info!("  NetBox URL: {}", config.netbox_url);
    info!("  NetBox prefix: {}", config.netbox_prefix_id);
    info!("  Namespace: {}", config.watch_namespace.as_deref().unwrap_or("all namespaces"));

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
