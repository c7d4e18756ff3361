//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use crate::naming::{DEFAULT_NAME_TEMPLATE, NameTemplate};
use crate::provider::Provider;
use std::net::SocketAddr;

const DEFAULT_TAG: &str = "kubernetes";
const DEFAULT_PROVIDER: &str = "netbox";
const DEFAULT_NETBOX_URL: &str = "http://netbox.netbox:80";
const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Controller configuration
#[derive(Clone)]
pub struct ControllerConfig {
    /// Value of `Tag` in the name template
    pub tag: String,
    /// Identity of this controller instance
    pub provider: Provider,
    pub name_template: NameTemplate,
    /// Release a fresh allocation when its status write fails
    pub release_on_persist_failure: bool,
    pub netbox_url: String,
    pub netbox_token: String,
    pub netbox_prefix_id: u64,
    /// Tags attached to allocations in NetBox
    pub netbox_tags: Vec<String>,
    /// Namespace to watch, all namespaces when unset
    pub watch_namespace: Option<String>,
    pub metrics_addr: SocketAddr,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("tag", &self.tag)
            .field("provider", &self.provider.name())
            .field("name_template", &self.name_template.source())
            .field("release_on_persist_failure", &self.release_on_persist_failure)
            .field("netbox_url", &self.netbox_url)
            .field("netbox_token", &"<redacted>")
            .field("netbox_prefix_id", &self.netbox_prefix_id)
            .field("netbox_tags", &self.netbox_tags)
            .field("watch_namespace", &self.watch_namespace)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ControllerError::Configuration(format!("{} environment variable is required", key))
            })
        };

        let provider = Provider::new(get("IPAM_NAME").unwrap_or_else(|| DEFAULT_PROVIDER.to_string()))?;
        let name_template = NameTemplate::parse(
            &get("IPAM_NAME_TEMPLATE").unwrap_or_else(|| DEFAULT_NAME_TEMPLATE.to_string()),
        )?;

        let release_on_persist_failure = match get("IPAM_RELEASE_ON_PERSIST_FAILURE") {
            Some(value) => parse_bool("IPAM_RELEASE_ON_PERSIST_FAILURE", &value)?,
            None => true,
        };

        let prefix = required("NETBOX_PREFIX_ID")?;
        let netbox_prefix_id = prefix.parse::<u64>().map_err(|_| {
            ControllerError::Configuration(format!("NETBOX_PREFIX_ID '{}' is not a valid prefix id", prefix))
        })?;

        let metrics = get("METRICS_ADDR").unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
        let metrics_addr = metrics.parse::<SocketAddr>().map_err(|e| {
            ControllerError::Configuration(format!("METRICS_ADDR '{}' is invalid: {}", metrics, e))
        })?;

        Ok(Self {
            tag: get("IPAM_TAG").unwrap_or_else(|| DEFAULT_TAG.to_string()),
            provider,
            name_template,
            release_on_persist_failure,
            netbox_url: get("NETBOX_URL").unwrap_or_else(|| DEFAULT_NETBOX_URL.to_string()),
            netbox_token: required("NETBOX_TOKEN")?,
            netbox_prefix_id,
            netbox_tags: get("NETBOX_TAGS").map(|tags| split_list(&tags)).unwrap_or_default(),
            watch_namespace: get("WATCH_NAMESPACE"),
            metrics_addr,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ControllerError::Configuration(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
