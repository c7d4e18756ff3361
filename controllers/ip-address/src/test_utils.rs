//! Test utilities for unit testing the reconciler
//!
//! This module provides fakes for the status store and event reporter,
//! and helpers for creating test `IpAddress` resources.

use crate::events::{EventReporter, EventSeverity};
use crate::naming::{NameResolver, NameTemplate};
use crate::provider::Provider;
use crate::reconciler::Reconciler;
use crate::store::{StatusStore, StoreError};
use crds::{IpAddress, IpAddressSpec, IpAddressStatus};
use ipam_client::MockIpam;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::{Arc, Mutex};

/// Helper to create a test IpAddress without status
pub fn create_test_ip_address(namespace: &str, name: &str, spec_name: &str, reference: &str) -> IpAddress {
    IpAddress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: IpAddressSpec {
            name: spec_name.to_string(),
            reference: reference.to_string(),
        },
        status: None,
    }
}

/// Helper to attach a status to a test IpAddress
pub fn with_status(mut ip: IpAddress, address: &str, name: &str, provider: &str) -> IpAddress {
    ip.status = Some(IpAddressStatus {
        address: address.to_string(),
        name: name.to_string(),
        provider: provider.to_string(),
    });
    ip
}

/// How the fake store answers writes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    #[default]
    Accept,
    /// The write is refused before reaching the API server
    Reject,
    /// The response is lost, the write may or may not have been applied
    Lose,
}

/// Status store recording every write
#[derive(Debug, Default)]
pub struct FakeStatusStore {
    updates: Mutex<Vec<(String, IpAddressStatus)>>,
    mode: Mutex<StoreMode>,
}

fn decode_error() -> serde_json::Error {
    serde_json::from_str::<serde_json::Value>("{").unwrap_err()
}

impl FakeStatusStore {
    /// Reject every following write
    pub fn fail(&self) {
        *self.mode.lock().unwrap() = StoreMode::Reject;
    }

    /// Fail every following write with an error that does not tell
    /// whether the API server applied it
    pub fn lose_responses(&self) {
        *self.mode.lock().unwrap() = StoreMode::Lose;
    }

    /// Writes accepted so far, keyed by `namespace/name`
    pub fn updates(&self) -> Vec<(String, IpAddressStatus)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StatusStore for FakeStatusStore {
    async fn update_status(&self, ip: &IpAddress, status: IpAddressStatus) -> Result<IpAddress, StoreError> {
        match *self.mode.lock().unwrap() {
            StoreMode::Accept => {}
            StoreMode::Reject => return Err(StoreError::MissingResourceVersion(ip.resource_key())),
            StoreMode::Lose => return Err(StoreError::Kube(kube::Error::SerdeError(decode_error()))),
        }

        self.updates
            .lock()
            .unwrap()
            .push((ip.resource_key(), status.clone()));

        let mut updated = ip.clone();
        updated.status = Some(status);
        Ok(updated)
    }
}

/// Event reporter recording every event
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(EventSeverity, String)>>,
    failing: Mutex<bool>,
}

impl RecordingEvents {
    /// Fail every following emit (after recording it)
    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    pub fn warnings(&self) -> Vec<String> {
        self.of(EventSeverity::Warning)
    }

    pub fn normals(&self) -> Vec<String> {
        self.of(EventSeverity::Normal)
    }

    fn of(&self, severity: EventSeverity) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl EventReporter for RecordingEvents {
    async fn emit(&self, _ip: &IpAddress, message: &str, severity: EventSeverity) -> Result<(), kube::Error> {
        self.events.lock().unwrap().push((severity, message.to_string()));

        if *self.failing.lock().unwrap() {
            return Err(kube::Error::SerdeError(decode_error()));
        }
        Ok(())
    }
}

/// Reconciler wired to fakes, with handles to inspect them
pub struct TestHarness {
    pub ipam: MockIpam,
    pub store: Arc<FakeStatusStore>,
    pub events: Arc<RecordingEvents>,
    pub reconciler: Reconciler,
}

/// Reconciler with tag `prod`, the default template and provider `netbox`,
/// allocating from `10.0.0.5` onwards
pub fn create_test_harness() -> TestHarness {
    create_test_harness_with(MockIpam::new("10.0.0").starting_at(5), "netbox")
}

pub fn create_test_harness_with(ipam: MockIpam, provider: &str) -> TestHarness {
    let store = Arc::new(FakeStatusStore::default());
    let events = Arc::new(RecordingEvents::default());
    let names = NameResolver::new("prod", NameTemplate::parse("{{.Tag}}-{{.Namespace}}-{{.Name}}").unwrap());

    let reconciler = Reconciler::new(
        Arc::new(ipam.clone()),
        store.clone(),
        events.clone(),
        names,
        Provider::new(provider).unwrap(),
    );

    TestHarness {
        ipam,
        store,
        events,
        reconciler,
    }
}
