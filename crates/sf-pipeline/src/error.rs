//! Error types for sf-pipeline.
//!
//! Everything except [`ErrorKind::Dispatch`] is scoped to one object's task
//! and ends up as that task's failure reason.

/// Result type alias for sf-pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sf-pipeline operations.
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

    /// Wrap a transport or query error for one object.
    ///
    /// The cause is folded into the message and not kept as a source, so
    /// chained renderings print it once.
    pub fn fetch(object: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Fetch {
            object: object.into(),
            message: cause.to_string(),
        })
    }

    /// Returns true if a value could not be converted to its declared type.
    pub fn is_coercion_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Coercion { .. } | ErrorKind::UnknownType { .. }
        )
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Schema file missing or malformed.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Object descriptor failed validation.
    #[error("Invalid object spec {object}: {message}")]
    InvalidSpec { object: String, message: String },

    /// Declared type tag has no coercion rule.
    #[error("Unknown type '{tag}' for field {field}")]
    UnknownType { field: String, tag: String },

    /// Query or transport failure for one object.
    #[error("Fetch failed for {object}: {message}")]
    Fetch { object: String, message: String },

    /// Returned columns differ from the requested field list.
    #[error(
        "Column mismatch for {object}: missing [{}], unexpected [{}]",
        missing.join(", "),
        unexpected.join(", ")
    )]
    ColumnMismatch {
        object: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Value incompatible with its declared type.
    #[error("Cannot coerce {field} value {value} to {expected}")]
    Coercion {
        field: String,
        value: String,
        expected: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Arrow batch construction error.
    #[error("Arrow error: {0}")]
    Arrow(String),

    /// Parquet encoding error.
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// A task died before producing a result.
    #[error("Task aborted: {0}")]
    Task(String),

    /// The dispatcher could not submit or await tasks.
    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Io(err.to_string()), err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::with_source(ErrorKind::Csv(err.to_string()), err)
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::with_source(ErrorKind::Arrow(err.to_string()), err)
    }
}

impl From<parquet::errors::ParquetError> for Error {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Error::with_source(ErrorKind::Parquet(err.to_string()), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Schema(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_names_cause_once() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = Error::fetch("Account", io);

        assert_eq!(err.to_string(), "Fetch failed for Account: reset by peer");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_column_mismatch_display() {
        let err = Error::new(ErrorKind::ColumnMismatch {
            object: "Contact".into(),
            missing: vec!["Age".into()],
            unexpected: vec!["Birthdate".into(), "Title".into()],
        });
        assert_eq!(
            err.to_string(),
            "Column mismatch for Contact: missing [Age], unexpected [Birthdate, Title]"
        );
    }

    #[test]
    fn test_is_coercion_error() {
        let err = Error::new(ErrorKind::Coercion {
            field: "Age".into(),
            value: "\"abc\"".into(),
            expected: "integer".into(),
        });
        assert!(err.is_coercion_error());
        assert!(err.to_string().contains("Age"));

        let err = Error::new(ErrorKind::UnknownType {
            field: "Age".into(),
            tag: "complex128".into(),
        });
        assert!(err.is_coercion_error());

        assert!(!Error::new(ErrorKind::Io("disk full".into())).is_coercion_error());
    }
}
