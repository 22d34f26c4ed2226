//! HTTP request building with Salesforce-specific headers.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
        }
    }
}

/// Builder for HTTP requests with Salesforce-specific options.
#[derive(Debug)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    pub(crate) url: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) bearer_token: Option<String>,
}

/// Request body content.
#[derive(Debug)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            query_params: Vec::new(),
            body: None,
            bearer_token: None,
        }
    }

    /// Set the bearer token for authentication.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        self.body = Some(RequestBody::Json(value));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Set XML body (SOAP login).
    pub fn xml(mut self, data: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(data.into()));
        self.headers
            .insert("Content-Type".to_string(), "text/xml; charset=UTF-8".to_string());
        self
    }

    /// Ask for CSV (Bulk API 2.0 query results).
    pub fn accept_csv(self) -> Self {
        self.header("Accept", "text/csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = RequestBuilder::new(RequestMethod::Get, "https://example.com/api")
            .bearer_auth("token123")
            .header("X-Custom", "value");

        assert_eq!(req.method, RequestMethod::Get);
        assert_eq!(req.url, "https://example.com/api");
        assert_eq!(req.bearer_token, Some("token123".to_string()));
        assert_eq!(req.headers.get("X-Custom"), Some(&"value".to_string()));
    }

    #[test]
    fn test_query_params_keep_order() {
        let req = RequestBuilder::new(RequestMethod::Get, "https://example.com")
            .query("locator", "abc")
            .query("maxRecords", "5000");

        assert_eq!(
            req.query_params,
            vec![
                ("locator".to_string(), "abc".to_string()),
                ("maxRecords".to_string(), "5000".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_body() {
        let data = serde_json::json!({"query": "SELECT Id FROM Account"});
        let req = RequestBuilder::new(RequestMethod::Post, "https://example.com")
            .json(&data)
            .unwrap();

        assert!(matches!(req.body, Some(RequestBody::Json(_))));
        assert_eq!(
            req.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[test]
    fn test_xml_body() {
        let req = RequestBuilder::new(RequestMethod::Post, "https://example.com")
            .xml("<login/>")
            .header("SOAPAction", "login");

        assert!(matches!(req.body, Some(RequestBody::Text(_))));
        assert_eq!(
            req.headers.get("Content-Type"),
            Some(&"text/xml; charset=UTF-8".to_string())
        );
        assert_eq!(req.headers.get("SOAPAction"), Some(&"login".to_string()));
    }

    #[test]
    fn test_accept_csv() {
        let req = RequestBuilder::new(RequestMethod::Get, "https://example.com").accept_csv();
        assert_eq!(req.headers.get("Accept"), Some(&"text/csv".to_string()));
    }
}
