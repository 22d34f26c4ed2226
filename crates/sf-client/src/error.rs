//! Errors raised while talking to a Salesforce org.

/// Result alias used across the client.
pub type Result<T> = std::result::Result<T, Error>;

/// A failed request, with the underlying cause when there is one.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the session was rejected (expired or revoked token).
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication(_))
    }
}

/// What went wrong talking to the org.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Non-success status without a Salesforce error body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 429 from the org's API limits. Not retried.
    #[error("Rate limited by Salesforce (HTTP 429)")]
    RateLimited,

    /// 401, usually an expired or revoked session.
    #[error("Session rejected: {0}")]
    Authentication(String),

    /// 403, the user lacks access to the object or field.
    #[error("Access denied: {0}")]
    Authorization(String),

    /// 404 on a query locator, job or sObject.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timed out")]
    Timeout,

    /// The org could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A response body that did not parse.
    #[error("Malformed JSON: {0}")]
    Json(String),

    /// Bad instance URL or client settings.
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// Error body returned by the REST API, e.g. `INVALID_FIELD`.
    #[error("Salesforce rejected the request: {error_code} - {message}")]
    SalesforceApi {
        error_code: String,
        message: String,
        fields: Vec<String>,
    },

    /// Any other transport failure.
    #[error("Request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ErrorKind::Transport(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::Config(format!("Invalid URL: {}", err)), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_session_is_auth_error() {
        assert!(Error::new(ErrorKind::Authentication("Session expired or invalid".into()))
            .is_auth_error());
        assert!(!Error::new(ErrorKind::Authorization("INSUFFICIENT_ACCESS".into()))
            .is_auth_error());
    }

    #[test]
    fn test_query_error_display() {
        let err = Error::new(ErrorKind::SalesforceApi {
            error_code: "INVALID_FIELD".to_string(),
            message: "No such column 'Age__c' on entity 'Contact'".to_string(),
            fields: vec![],
        });
        assert_eq!(
            err.to_string(),
            "Salesforce rejected the request: INVALID_FIELD - No such column 'Age__c' on entity 'Contact'"
        );

        let err = Error::new(ErrorKind::Http {
            status: 503,
            message: "Service Unavailable".into(),
        });
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    }

    #[test]
    fn test_conversions_keep_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{\"records\": [").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
        assert!(err.source.is_some());

        let err: Error = url::Url::parse("na1.salesforce.com").unwrap_err().into();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
        assert!(err.to_string().contains("Invalid URL"));
    }
}
