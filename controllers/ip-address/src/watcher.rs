//! Kubernetes resource watcher.
//!
//! Drives the reconciler from a `kube_runtime::Controller`. A finalizer
//! scoped to this provider keeps deleted objects around until their address
//! was released: `Apply` events go to the created-or-updated handler and
//! `Cleanup` events to the deleted handler.

use crate::backoff::RetryTracker;
use crate::error::ControllerError;
use crate::metrics;
use crate::reconciler::Reconciler;
use crate::server::Readiness;
use crds::IpAddress;
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{self, Event as FinalizerEvent};
use kube_runtime::{Controller, watcher};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation
pub struct Context {
    client: Client,
    reconciler: Arc<Reconciler>,
    retries: RetryTracker,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("reconciler", &self.reconciler)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(client: Client, reconciler: Arc<Reconciler>) -> Self {
        Self {
            client,
            reconciler,
            retries: RetryTracker::default(),
        }
    }
}

/// Unwraps handler failures from the finalizer helper so they keep their kind
fn from_finalizer_error(error: finalizer::Error<ControllerError>) -> ControllerError {
    match error {
        finalizer::Error::ApplyFailed(e) | finalizer::Error::CleanupFailed(e) => e,
        other => ControllerError::Finalizer(Box::new(other)),
    }
}

/// Routes a finalizer event to the matching reconciler handler
async fn dispatch(reconciler: &Reconciler, event: FinalizerEvent<IpAddress>) -> Result<Action, ControllerError> {
    match event {
        FinalizerEvent::Apply(ip) => reconciler.on_created_or_updated(&ip).await?,
        FinalizerEvent::Cleanup(ip) => reconciler.on_deleted(&ip).await?,
    }
    Ok(Action::await_change())
}

async fn reconcile(ip: Arc<IpAddress>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ip.resource_key();
    let namespace = ip.metadata.namespace.as_deref().unwrap_or("default");
    let api: Api<IpAddress> = Api::namespaced(ctx.client.clone(), namespace);
    let finalizer_name = ctx.reconciler.provider().finalizer();

    debug!("Reconciling IpAddress {}", key);

    let reconciler = ctx.reconciler.clone();
    let action = finalizer::finalizer(&api, &finalizer_name, ip, |event| async move {
        dispatch(&reconciler, event).await
    })
    .await
    .map_err(from_finalizer_error)?;

    ctx.retries.reset(&key);
    Ok(action)
}

fn error_policy(ip: Arc<IpAddress>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = ip.resource_key();
    let delay = ctx.retries.next_delay(&key);
    metrics::record_failure(error.kind());

    warn!(
        "Reconciliation of IpAddress {} failed, retrying in {}s: {}",
        key,
        delay.as_secs(),
        error
    );
    Action::requeue(delay)
}

/// Watches `IpAddress` resources until the stream ends.
///
/// `readiness` is set once the controller stream is built and about to be polled.
pub async fn watch_ip_addresses(
    api: Api<IpAddress>,
    ctx: Arc<Context>,
    readiness: Readiness,
) -> Result<(), ControllerError> {
    info!("Starting IpAddress watcher");

    let stream = Controller::new(api, watcher::Config::default()).run(reconcile, error_policy, ctx);
    readiness.set_ready();

    stream
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled IpAddress {}", obj),
                Err(e) => error!("IpAddress controller error: {}", e),
            }
        })
        .await;

    Err(ControllerError::Watch("IpAddress watch stream ended".to_string()))
}
