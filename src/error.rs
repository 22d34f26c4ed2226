//! Error types for the export orchestrator.
//!
//! Every variant here is fatal: the run stops before any object is exported.
//! Per-object failures never surface as an [`Error`]; they are reported in
//! the pipeline's outcomes.

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for orchestrator operations.
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

    /// Returns true if Salesforce rejected the configured credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication(_))
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A required input file does not exist.
    #[error("Missing input file: {0}")]
    MissingInput(String),

    /// Config file unreadable or invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Object descriptor file unreadable or invalid.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Login rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Could not reach Salesforce or build a client.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Log sink setup failed.
    #[error("Logging error: {0}")]
    Logging(String),

    /// Output directory setup or dispatcher failure.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

// Lower-layer errors are flattened into the message so a chained
// rendering shows each cause once.
impl From<busbar_sf_auth::Error> for Error {
    fn from(err: busbar_sf_auth::Error) -> Self {
        let kind = match err.kind {
            busbar_sf_auth::ErrorKind::LoginFault { .. }
            | busbar_sf_auth::ErrorKind::InvalidCredentials(_) => {
                ErrorKind::Authentication(err.to_string())
            }
            _ => ErrorKind::Connection(err.to_string()),
        };
        Error::new(kind)
    }
}

impl From<busbar_sf_client::Error> for Error {
    fn from(err: busbar_sf_client::Error) -> Self {
        let kind = if err.is_auth_error() {
            ErrorKind::Authentication(err.to_string())
        } else {
            ErrorKind::Connection(err.to_string())
        };
        Error::new(kind)
    }
}

impl From<busbar_sf_pipeline::Error> for Error {
    fn from(err: busbar_sf_pipeline::Error) -> Self {
        let kind = match err.kind {
            busbar_sf_pipeline::ErrorKind::Schema(_) => ErrorKind::Schema(err.to_string()),
            _ => ErrorKind::Pipeline(err.to_string()),
        };
        Error::new(kind)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorKind::Config(err.to_string()))
    }
}
