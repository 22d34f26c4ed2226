//! Core HTTP client with compression and Salesforce-specific handling.

use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestBuilder, RequestMethod};
use crate::response::{Response, ResponseExt};

/// HTTP client for Salesforce APIs with compression and error decoding.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct SfHttpClient {
    inner: reqwest::Client,
}

impl SfHttpClient {
    /// Create a new HTTP client from the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner })
    }

    /// GET without credentials; callers attach the bearer token.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, url)
    }

    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Post, url)
    }

    /// Send a request and hand back the response whatever its status.
    ///
    /// Used where the error body is not a REST error, such as SOAP faults.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), &request.url);

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if !request.query_params.is_empty() {
            req = req.query(&request.query_params);
        }

        if let Some(body) = request.body {
            req = match body {
                RequestBody::Json(value) => req.json(&value),
                RequestBody::Text(text) => req.body(text),
            };
        }

        debug!("Sending request");

        let response = req.send().await?;
        let status = response.status().as_u16();

        let content_length = response.content_length();
        if response.status().is_success() {
            debug!(status, content_length, "Response received");
        } else {
            info!(status, content_length, "Non-success response");
        }

        Ok(Response::new(response))
    }

    /// Send a request and turn any non-success status into an error.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.send(request).await?;
        let status = response.status();

        if status == 429 {
            return Err(Error::new(ErrorKind::RateLimited));
        }

        if matches!(status, 500 | 502 | 503 | 504) {
            return Err(Error::new(ErrorKind::Http {
                status,
                message: format!("Server error: {}", status),
            }));
        }

        response.check_salesforce_error().await
    }

    /// Execute a request and deserialize the JSON response.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        response.json().await
    }
}
