//! Query client over HTTP.
//!
//! [`Client`] owns a connection pool (via `reqwest`) and the endpoint
//! configuration; each [`Client::query`] call streams one result set back
//! through a [`ResultCursor`]. Clients are cheap to clone and safe to share
//! across tasks.

use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::cursor::ResultCursor;
use crate::error::{ClientError, Result};
use crate::source::HttpChunkSource;

/// Handle to one query service endpoint.
///
/// ## Example
///
/// ```ignore
/// use emberwire_client::Client;
///
/// let client = Client::builder()
///     .endpoint("https://api.example.com/query")
///     .database("analytics")
///     .token(std::env::var("EMBERWIRE_TOKEN")?)
///     .build()?;
///
/// let mut cursor = client.query("SELECT id, name FROM users").await?;
/// while let Some(row) = cursor.next_row().await? {
///     println!("{:?}", row.values());
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build a client from an already-loaded configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        reqwest::Url::parse(&config.endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint URL: {}", e)))?;
        if config.database.is_empty() {
            return Err(ClientError::Config("database must not be empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Run a query and stream its result set.
    ///
    /// The returned cursor has already parsed the header, so column
    /// metadata is available before any row is read.
    pub async fn query(&self, sql: &str) -> Result<ResultCursor> {
        let compress = if self.config.compression { "1" } else { "0" };
        let mut request = self
            .http
            .post(&self.config.endpoint)
            .query(&[
                ("database", self.config.database.as_str()),
                ("output_format", "binary_with_names_and_types"),
                ("compress", compress),
            ])
            .body(sql.to_string());
        for (key, value) in &self.config.settings {
            request = request.query(&[(key.as_str(), value.as_str())]);
        }
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        debug!(database = %self.config.database, compress, "sending query");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        ResultCursor::open(
            Box::new(HttpChunkSource::new(response)),
            self.config.compression,
        )
        .await
    }

    /// Run a statement and discard any rows it returns.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        let mut cursor = self.query(sql).await?;
        while cursor.next_row().await?.is_some() {}
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    endpoint: Option<String>,
    database: Option<String>,
    token: Option<String>,
    compression: bool,
    timeout: Duration,
    settings: Vec<(String, String)>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            database: None,
            token: None,
            compression: true,
            timeout: Duration::from_secs(300),
            settings: Vec::new(),
        }
    }

    /// Base URL of the query endpoint. Required.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Database for unqualified table names. Required.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Bearer token sent with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Ask the server for LZ4-framed responses. Defaults to on.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// End-to-end request timeout, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a query-level setting passed through as a request parameter.
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Client> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| ClientError::Config("endpoint is required".to_string()))?;
        let database = self
            .database
            .ok_or_else(|| ClientError::Config("database is required".to_string()))?;
        Client::from_config(ClientConfig {
            endpoint,
            database,
            token: self.token,
            compression: self.compression,
            timeout: self.timeout,
            settings: self.settings,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
