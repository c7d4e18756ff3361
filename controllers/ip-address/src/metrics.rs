//! Prometheus metrics for the IpAddress Controller.
//!
//! Counters live in a dedicated registry rendered on `/metrics`. Before
//! `init_metrics()` runs (as in unit tests) recording is a no-op.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metric names
pub mod names {
    pub const ASSIGNMENTS_TOTAL: &str = "ipam_assignments_total";
    pub const RELEASES_TOTAL: &str = "ipam_releases_total";
    pub const RECONCILE_FAILURES_TOTAL: &str = "ipam_reconcile_failures_total";
}

/// How an address came to be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    /// Freshly allocated from the backend
    Allocated,
    /// Borrowed from an existing allocation
    Reference,
}

impl AssignmentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allocated => "allocated",
            Self::Reference => "reference",
        }
    }
}

/// Controller counters and the registry holding them
pub struct Metrics {
    registry: Registry,
    assignments: IntCounterVec,
    releases: IntCounter,
    failures: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let assignments = IntCounterVec::new(
            Opts::new(names::ASSIGNMENTS_TOTAL, "Addresses assigned to IpAddress resources"),
            &["source"],
        )?;
        let releases = IntCounter::new(names::RELEASES_TOTAL, "Addresses released in the IPAM backend")?;
        let failures = IntCounterVec::new(
            Opts::new(names::RECONCILE_FAILURES_TOTAL, "Failed IpAddress reconciliations"),
            &["kind"],
        )?;

        registry.register(Box::new(assignments.clone()))?;
        registry.register(Box::new(releases.clone()))?;
        registry.register(Box::new(failures.clone()))?;

        Ok(Self {
            registry,
            assignments,
            releases,
            failures,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Install the process-wide metrics.
///
/// Returns `false` if they were already installed or creation failed.
pub fn init_metrics() -> bool {
    if METRICS.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    match Metrics::new() {
        Ok(metrics) => {
            if METRICS.set(metrics).is_err() {
                tracing::warn!("Failed to store Prometheus metrics (already set)");
                return false;
            }
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create Prometheus metrics");
            false
        }
    }
}

/// Render all metrics, `None` before initialization or when encoding fails.
pub fn render_metrics() -> Option<String> {
    let metrics = METRICS.get()?;
    match metrics.render() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            None
        }
    }
}

pub fn record_assignment(source: AssignmentSource) {
    if let Some(metrics) = METRICS.get() {
        metrics.assignments.with_label_values(&[source.as_str()]).inc();
    }
}

pub fn record_release() {
    if let Some(metrics) = METRICS.get() {
        metrics.releases.inc();
    }
}

pub fn record_failure(kind: &str) {
    if let Some(metrics) = METRICS.get() {
        metrics.failures.with_label_values(&[kind]).inc();
    }
}
