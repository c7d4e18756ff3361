//! Kubernetes events for `IpAddress` resources.

use crds::IpAddress;
use kube::{Client, Resource};
use kube_runtime::events::{Event, EventType, Recorder, Reporter};

/// Severity of a reported event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Records human-readable notices against a resource
#[async_trait::async_trait]
pub trait EventReporter: Send + Sync {
    async fn emit(&self, ip: &IpAddress, message: &str, severity: EventSeverity) -> Result<(), kube::Error>;
}

/// Publishes events through the Kubernetes events API
#[derive(Clone)]
pub struct KubeEventReporter {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventReporter").finish_non_exhaustive()
    }
}

impl KubeEventReporter {
    /// Creates a reporter publishing as `controller`
    pub fn new(client: Client, controller: &str) -> Self {
        let reporter = Reporter {
            controller: controller.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };

        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait::async_trait]
impl EventReporter for KubeEventReporter {
    async fn emit(&self, ip: &IpAddress, message: &str, severity: EventSeverity) -> Result<(), kube::Error> {
        let (type_, reason) = match severity {
            EventSeverity::Normal => (EventType::Normal, "Reconciled"),
            EventSeverity::Warning => (EventType::Warning, "ReconcileFailed"),
        };

        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: "Reconciling".to_string(),
            secondary: None,
        };

        self.recorder.publish(&event, &ip.object_ref(&())).await
    }
}
