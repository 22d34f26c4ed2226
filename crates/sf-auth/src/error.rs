//! Error types for sf-auth.
//!
//! Error messages never include password, token or session values.

/// Result type alias for sf-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-auth operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if Salesforce rejected the supplied credentials.
    pub fn is_invalid_login(&self) -> bool {
        match &self.kind {
            ErrorKind::LoginFault { code, .. } => code.ends_with("INVALID_LOGIN"),
            ErrorKind::InvalidCredentials(_) => true,
            _ => false,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// SOAP fault returned by the login endpoint.
    #[error("Login failed: {code} - {message}")]
    LoginFault { code: String, message: String },

    /// Invalid credentials configuration.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Login endpoint answered with something that is not a login result.
    #[error("Invalid login response: {0}")]
    InvalidResponse(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<busbar_sf_client::Error> for Error {
    fn from(err: busbar_sf_client::Error) -> Self {
        use busbar_sf_client::ErrorKind as Transport;

        // Connection failures name the URL; report them without it
        let kind = match &err.kind {
            Transport::Timeout => ErrorKind::Http("login request timed out".to_string()),
            Transport::Connection(_) => {
                ErrorKind::Http("could not connect to login endpoint".to_string())
            }
            Transport::Config(message) => ErrorKind::Config(message.clone()),
            _ => ErrorKind::Http(err.to_string()),
        };
        Error::new(kind)
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
    fn test_error_kind_display() {
        let err = ErrorKind::LoginFault {
            code: "sf:INVALID_LOGIN".to_string(),
            message: "Invalid username, password, security token; or user locked out."
                .to_string(),
        };
        assert!(err.to_string().starts_with("Login failed: sf:INVALID_LOGIN"));

        let err = ErrorKind::InvalidCredentials("username is empty".to_string());
        assert_eq!(err.to_string(), "Invalid credentials: username is empty");
    }

    #[test]
    fn test_is_invalid_login() {
        let fault = Error::new(ErrorKind::LoginFault {
            code: "sf:INVALID_LOGIN".into(),
            message: "bad".into(),
        });
        assert!(fault.is_invalid_login());

        let other_fault = Error::new(ErrorKind::LoginFault {
            code: "sf:API_DISABLED_FOR_ORG".into(),
            message: "nope".into(),
        });
        assert!(!other_fault.is_invalid_login());

        assert!(!Error::new(ErrorKind::Http("timeout".into())).is_invalid_login());
    }

    #[test]
    fn test_transport_errors_hide_endpoint() {
        let err: Error = busbar_sf_client::Error::new(busbar_sf_client::ErrorKind::Connection(
            "error sending request for url (https://acme.my.salesforce.com/services/Soap/u/62.0)"
                .into(),
        ))
        .into();
        assert_eq!(err.to_string(), "HTTP error: could not connect to login endpoint");

        let err: Error = busbar_sf_client::Error::new(busbar_sf_client::ErrorKind::Timeout).into();
        assert!(matches!(err.kind, ErrorKind::Http(ref m) if m == "login request timed out"));
    }

    #[test]
    fn test_from_url_parse_error() {
        let err: Error = url::Url::parse("::nope").unwrap_err().into();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
        assert!(err.source.is_some());
    }
}
