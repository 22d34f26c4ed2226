//! Types for Bulk API 2.0 query jobs.

use serde::{Deserialize, Serialize};

/// One result row, keyed by column header.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Bulk API 2.0 job states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is open and accepting data
    Open,
    /// Upload is complete, job is ready for processing
    UploadComplete,
    /// Job is processing
    InProgress,
    /// Job was aborted
    Aborted,
    /// Job completed successfully
    JobComplete,
    /// Job failed
    Failed,
}

impl JobState {
    /// Check if job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Aborted | JobState::JobComplete | JobState::Failed
        )
    }

    /// Check if job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobState::JobComplete)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Query job operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryOperation {
    /// Live records only
    #[default]
    Query,
    /// Include deleted and archived records
    QueryAll,
}

/// Request to create a query job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryJobRequest {
    /// SOQL query
    pub query: String,
    /// Operation type (query or queryAll)
    pub operation: QueryOperation,
    /// Column delimiter
    pub column_delimiter: String,
    /// Line ending
    pub line_ending: String,
}

impl CreateQueryJobRequest {
    /// Create a new query job request with comma-delimited, LF-terminated output.
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            query: soql.into(),
            operation: QueryOperation::Query,
            column_delimiter: "COMMA".to_string(),
            line_ending: "LF".to_string(),
        }
    }
}

/// Query job response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJob {
    /// Job ID
    pub id: String,
    /// Current state
    pub state: JobState,
    /// SOQL query
    #[serde(default)]
    pub query: Option<String>,
    /// Operation type
    #[serde(default)]
    pub operation: Option<QueryOperation>,
    /// Number of records processed
    #[serde(default)]
    pub number_records_processed: i64,
    /// Job creation time
    #[serde(default)]
    pub created_date: Option<String>,
    /// Total processing time in milliseconds
    #[serde(default)]
    pub total_processing_time: Option<i64>,
    /// Error message if failed
    #[serde(default)]
    pub error_message: Option<String>,
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct QueryResults {
    /// CSV data, header row included
    pub csv_data: String,
    /// Locator for next page (None if no more pages)
    pub locator: Option<String>,
}
