//! NetBox-backed IPAM
//!
//! Allocates addresses from a single NetBox prefix. NetBox picks the next
//! free address; this adapter only registers, finds and deletes records.

use crate::common::HttpClient;
use crate::error::IpamError;
use crate::models::{AllocateIPRequest, IPAddress, IPAddressStatus, Prefix, TagRef};
use crate::ipam_trait::Ipam;
use reqwest::Client;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// IPAM backend allocating from a NetBox prefix
#[derive(Debug, Clone)]
pub struct NetBoxIpam {
    http: HttpClient,
    prefix_id: u64,
    tags: Vec<TagRef>,
}

impl NetBoxIpam {
    /// Create a new NetBox IPAM adapter
    ///
    /// # Arguments
    /// * `base_url` - NetBox base URL (e.g., "http://netbox:80")
    /// * `token` - API token for authentication
    /// * `prefix_id` - Prefix new addresses are allocated from
    pub fn new(base_url: String, token: String, prefix_id: u64) -> Result<Self, IpamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(IpamError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
            prefix_id,
            tags: Vec::new(),
        })
    }

    /// Attach these tag slugs to every allocation
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(|slug| TagRef { slug: slug.into() }).collect();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token and the configured prefix.
    ///
    /// Called once at startup so misconfiguration fails fast instead of
    /// surfacing as per-resource allocation errors.
    pub async fn validate(&self) -> Result<(), IpamError> {
        debug!("Validating NetBox token and connectivity");
        let _: serde_json::Value = self.http.get("/api/status/").await?;
        self.prefix().await?;
        debug!("NetBox token and prefix {} validated", self.prefix_id);
        Ok(())
    }

    async fn prefix(&self) -> Result<Prefix, IpamError> {
        self.http
            .get(&format!("/api/ipam/prefixes/{}/", self.prefix_id))
            .await
    }

    async fn query_ip_addresses(&self, filters: &[(&str, &str)]) -> Result<Vec<IPAddress>, IpamError> {
        let path = format!(
            "/api/ipam/ip-addresses/?{}",
            HttpClient::build_query_string(filters)
        );
        debug!("Querying IP addresses with filters: {:?}", filters);
        self.http.fetch_all_pages(&path).await
    }
}

#[async_trait::async_trait]
impl Ipam for NetBoxIpam {
    async fn assign(&self, name: &str) -> Result<String, IpamError> {
        let request = AllocateIPRequest {
            description: name.to_string(),
            status: IPAddressStatus::Active,
            tags: self.tags.clone(),
        };
        let body = serde_json::to_value(&request)?;
        let path = format!("/api/ipam/prefixes/{}/available-ips/", self.prefix_id);

        // NetBox answers with an object for a single allocation and with an
        // array when several were requested; accept both.
        let created: serde_json::Value = self.http.post(&path, &body).await?;
        let ip: IPAddress = match created {
            serde_json::Value::Array(mut items) if !items.is_empty() => {
                serde_json::from_value(items.swap_remove(0))?
            }
            serde_json::Value::Array(_) => {
                return Err(IpamError::Exhausted(format!(
                    "prefix {} returned no address",
                    self.prefix_id
                )));
            }
            other => serde_json::from_value(other)?,
        };

        info!("NetBox allocated {} (id {}) for '{}'", ip.address, ip.id, name);
        Ok(ip.host().to_string())
    }

    async fn unassign(&self, address: &str) -> Result<(), IpamError> {
        let prefix = self.prefix().await?;
        let vrf = prefix.vrf_id().map(|id| id.to_string());

        let mut filters = vec![("address", address), ("parent", prefix.prefix.as_str())];
        if let Some(vrf) = vrf.as_deref() {
            filters.push(("vrf_id", vrf));
        }
        let records = self.query_ip_addresses(&filters).await?;

        // Only records this adapter could have created are deleted; the same
        // address may exist in other VRFs or with other masks.
        let (owned, foreign): (Vec<IPAddress>, Vec<IPAddress>) = records
            .into_iter()
            .partition(|ip| ip.is_allocated_from(&prefix) && ip.has_tags(&self.tags));

        for ip in &foreign {
            warn!(
                "Not deleting NetBox record {} (id {}): not allocated from prefix {}",
                ip.address, ip.id, prefix.prefix
            );
        }

        if owned.is_empty() {
            return Err(IpamError::NotFound(format!(
                "address {} is not registered in prefix {}",
                address, prefix.prefix
            )));
        }

        for record in owned {
            self.http
                .delete(&format!("/api/ipam/ip-addresses/{}/", record.id))
                .await?;
            info!("NetBox released {} (id {})", record.address, record.id);
        }

        Ok(())
    }

    async fn search(&self, query: &str, exact: bool) -> Result<Vec<String>, IpamError> {
        let records = self.query_ip_addresses(&[("q", query)]).await?;

        let hosts: BTreeSet<String> = records
            .iter()
            .filter(|ip| !exact || ip.is_named(query))
            .map(|ip| ip.host().to_string())
            .collect();

        debug!("Search '{}' (exact: {}) matched {} address(es)", query, exact, hosts.len());
        Ok(hosts.into_iter().collect())
    }
}
