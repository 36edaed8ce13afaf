//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for one query service endpoint.
///
/// Serializable so deployments can load it from a config file; the builder
/// on [`Client`](crate::Client) covers programmatic construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the query endpoint, e.g. `https://api.example.com/query`.
    pub endpoint: String,

    /// Database to resolve unqualified table names against.
    pub database: String,

    /// Bearer token, if the deployment requires one.
    #[serde(default)]
    pub token: Option<String>,

    /// Ask the server to compress result frames (LZ4).
    #[serde(default = "default_compression")]
    pub compression: bool,

    /// End-to-end timeout for the HTTP request, response body included.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Extra query-level settings passed through as request parameters.
    #[serde(default)]
    pub settings: Vec<(String, String)>,
}

fn default_compression() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            database: database.into(),
            token: None,
            compression: default_compression(),
            timeout: default_timeout(),
            settings: Vec::new(),
        }
    }
}
