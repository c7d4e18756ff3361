//! IPAM backend errors

use thiserror::Error;

/// Errors that can occur when talking to an IPAM backend
#[derive(Debug, Error)]
pub enum IpamError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error
    #[error("IPAM API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, expired, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Address or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No free address left to hand out
    #[error("Address pool exhausted: {0}")]
    Exhausted(String),
}
