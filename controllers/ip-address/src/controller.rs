//! Main controller implementation.
//!
//! Wires the NetBox backend, the Kubernetes adapters and the reconciler
//! together, then runs the watcher and the probe server until shutdown.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::KubeEventReporter;
use crate::metrics;
use crate::naming::NameResolver;
use crate::reconciler::Reconciler;
use crate::server::{self, Readiness};
use crate::store::KubeStatusStore;
use crate::watcher::{self, Context};
use crds::IpAddress;
use ipam_client::NetBoxIpam;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

const CONTROLLER_NAME: &str = "ip-address-controller";

/// Main controller for IpAddress management.
#[derive(Debug)]
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
    server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing IpAddress Controller");

        let kube_client = Client::try_default().await?;

        let ipam = NetBoxIpam::new(
            config.netbox_url.clone(),
            config.netbox_token.clone(),
            config.netbox_prefix_id,
        )?
        .with_tags(config.netbox_tags.clone());
        ipam.validate().await?;
        info!(
            "Connected to NetBox at {}, allocating from prefix {}",
            ipam.base_url(),
            config.netbox_prefix_id
        );

        let reconciler = Reconciler::new(
            Arc::new(ipam),
            Arc::new(KubeStatusStore::new(kube_client.clone())),
            Arc::new(KubeEventReporter::new(kube_client.clone(), CONTROLLER_NAME)),
            NameResolver::new(config.tag.clone(), config.name_template.clone()),
            config.provider.clone(),
        )
        .with_release_on_persist_failure(config.release_on_persist_failure);

        let api: Api<IpAddress> = match config.watch_namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        metrics::init_metrics();
        let readiness = Readiness::default();
        let server = tokio::spawn(server::serve(config.metrics_addr, readiness.clone()));

        let ctx = Arc::new(Context::new(kube_client, Arc::new(reconciler)));
        let watcher = tokio::spawn(watcher::watch_ip_addresses(api, ctx, readiness));

        Ok(Self { watcher, server })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("IpAddress Controller running");

        let result = tokio::select! {
            result = &mut self.watcher => {
                result.map_err(|e| ControllerError::Watch(format!("IpAddress watcher panicked: {}", e)))?
            }
            result = &mut self.server => {
                result.map_err(|e| ControllerError::Watch(format!("Probe server panicked: {}", e)))?
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Received shutdown signal, stopping IpAddress Controller");
                Ok(())
            }
        };

        self.watcher.abort();
        self.server.abort();
        result
    }
}
