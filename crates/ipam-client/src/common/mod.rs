//! Common utilities for the NetBox HTTP adapter
//!
//! Wraps `reqwest` with token authentication, status-code mapping and
//! pagination.

use crate::error::IpamError;
use crate::models::PaginatedResponse;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Map non-success responses onto `IpamError`
    async fn check(response: Response, what: &str) -> Result<Response, IpamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => IpamError::NotFound(format!("{} - {}", what, body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                IpamError::Authentication(format!("{}: {} - {}", what, status, body))
            }
            _ => IpamError::Api(format!("{} failed: {} - {}", what, status, body)),
        })
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, IpamError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(IpamError::Http)?;

        let response = Self::check(response, &format!("GET {}", path)).await?;
        response.json().await.map_err(IpamError::Http)
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, IpamError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(IpamError::Http)?;

        let response = Self::check(response, &format!("POST {}", path)).await?;
        response.json().await.map_err(IpamError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), IpamError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(IpamError::Http)?;

        Self::check(response, &format!("DELETE {}", path)).await?;
        Ok(())
    }

    /// Fetch all pages of a paginated listing
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, IpamError> {
        let mut all_results = Vec::new();
        let mut next = Some(path.to_string());

        while let Some(page_path) = next {
            let page: PaginatedResponse<T> = self.get(&page_path).await?;
            all_results.extend(page.results);
            next = page.next;
        }

        Ok(all_results)
    }

    /// Build query string from filters
    pub fn build_query_string(filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
