//! Authenticated Salesforce client with typed HTTP methods.
//!
//! `SalesforceClient` pairs a session (instance URL + session token) with a
//! shared [`SfHttpClient`]. The access token is redacted in Debug output and
//! request bodies are skipped in tracing spans.

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::RequestBuilder;
use crate::DEFAULT_API_VERSION;

/// High-level Salesforce API client.
///
/// Clones share the underlying connection pool, so one client can be handed
/// to every export worker.
///
/// # Example
///
/// ```rust,ignore
/// use busbar_sf_client::SalesforceClient;
///
/// let client = SalesforceClient::new(session.instance_url(), session.access_token())?
///     .with_api_version("62.0");
///
/// let rows: Vec<serde_json::Map<String, serde_json::Value>> =
///     client.query_all("SELECT Id, Name FROM Account").await?;
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    instance_url: String,
    access_token: String,
    api_version: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a new Salesforce client with the given instance URL and access token.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(instance_url, access_token, ClientConfig::default())
    }

    /// Create a new Salesforce client with custom configuration.
    pub fn with_config(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let http = SfHttpClient::new(config)?;
        Ok(Self {
            http,
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Set the API version (e.g., "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the instance URL.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Get the access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build the full URL for a path.
    ///
    /// Paths are joined onto the instance URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.instance_url, path)
        } else {
            format!("{}/{}", self.instance_url, path)
        }
    }

    /// Build the REST API URL for a path.
    ///
    /// Example: `rest_url("query")` -> `/services/data/v62.0/query`
    pub fn rest_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Build the Bulk API 2.0 URL for a path.
    ///
    /// Example: `bulk_url("query")` -> `/services/data/v62.0/jobs/query`
    pub fn bulk_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!(
            "{}/services/data/v{}/jobs/{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Authenticated GET.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    /// Authenticated POST.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }

    /// Send a prepared request; non-success statuses come back as errors.
    pub async fn execute(&self, request: RequestBuilder) -> Result<crate::Response> {
        self.http.execute(request).await
    }

    /// GET `url` (relative to the instance or absolute) and decode the JSON body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let full_url = self.url(url);
        self.http.send_json(self.get(&full_url)).await
    }

    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let full_url = self.url(url);
        let request = self.post(&full_url).json(body)?;
        self.http.send_json(request).await
    }

    /// Execute a SOQL query via the REST API (first page only).
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        let url = format!("{}?q={}", self.rest_url("query"), urlencoding::encode(soql));
        self.get_json(&url).await
    }

    /// Execute a SOQL query and follow `nextRecordsUrl` until done.
    #[instrument(skip(self, soql))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let mut result: QueryResult<T> = self.query(soql).await?;
        let mut all_records = Vec::with_capacity(result.total_size as usize);
        all_records.append(&mut result.records);

        while let Some(next_url) = result.next_records_url.take() {
            debug!(fetched = all_records.len(), total = result.total_size, "Fetching next page");
            result = self.get_json(&next_url).await?;
            all_records.append(&mut result.records);
        }

        Ok(all_records)
    }
}

/// Result of a SOQL query.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct QueryResult<T> {
    /// Total number of records matching the query.
    #[serde(rename = "totalSize")]
    pub total_size: u64,

    /// Whether all records are returned (no more pages).
    pub done: bool,

    /// URL to fetch next batch of results.
    #[serde(rename = "nextRecordsUrl")]
    pub next_records_url: Option<String>,

    /// The records.
    pub records: Vec<T>,
}
