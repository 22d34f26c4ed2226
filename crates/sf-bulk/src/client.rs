//! Bulk API 2.0 query client.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument};

use busbar_sf_client::SalesforceClient;

use crate::error::{Error, ErrorKind, Result};
use crate::types::*;

/// Default polling interval for job status checks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Salesforce Bulk API 2.0 query client.
///
/// Jobs are polled until they reach a terminal state; there is no overall
/// wait limit.
///
/// # Example
///
/// ```rust,ignore
/// use busbar_sf_bulk::{BulkApiClient, CreateQueryJobRequest};
///
/// let client = BulkApiClient::from_client(salesforce_client);
///
/// let job = client
///     .create_query_job(CreateQueryJobRequest::new("SELECT Id FROM Account"))
///     .await?;
/// let job = client.wait_for_query_job(&job.id).await?;
/// let page = client.get_query_results(&job.id, None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
    poll_interval: Duration,
}

impl BulkApiClient {
    /// Share an authenticated client's session and connection pool.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the polling interval for job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Get the polling interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Create a query job.
    #[instrument(skip(self, request))]
    pub async fn create_query_job(&self, request: CreateQueryJobRequest) -> Result<QueryJob> {
        let url = self.client.bulk_url("query");
        let job: QueryJob = self.client.post_json(&url, &request).await?;
        debug!(job_id = %job.id, state = %job.state, "Query job created");
        Ok(job)
    }

    /// Get the current status of a query job.
    #[instrument(skip(self))]
    pub async fn get_query_job(&self, job_id: &str) -> Result<QueryJob> {
        let url = format!("{}/{}", self.client.bulk_url("query"), job_id);
        Ok(self.client.get_json(&url).await?)
    }

    /// Poll a query job until it reaches a terminal state.
    #[instrument(skip(self))]
    pub async fn wait_for_query_job(&self, job_id: &str) -> Result<QueryJob> {
        loop {
            let job = self.get_query_job(job_id).await?;

            if job.state.is_terminal() {
                debug!(
                    state = %job.state,
                    records = job.number_records_processed,
                    "Query job finished"
                );
                return Ok(job);
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Get one page of query results.
    ///
    /// Returns the page as CSV. Pass the previous page's locator to continue.
    #[instrument(skip(self))]
    pub async fn get_query_results(
        &self,
        job_id: &str,
        locator: Option<&str>,
    ) -> Result<QueryResults> {
        let url = format!("{}/{}/results", self.client.bulk_url("query"), job_id);

        let mut request = self.client.get(&url).accept_csv();
        if let Some(loc) = locator {
            request = request.query("locator", loc);
        }

        let response = self.client.execute(request).await?;
        let next_locator = response.sforce_locator().map(|s| s.to_string());
        let csv_data = response.text().await?;

        Ok(QueryResults {
            csv_data,
            locator: next_locator,
        })
    }

    /// Get every result row of a completed job, following locators.
    ///
    /// Each page carries its own header row and is parsed on its own.
    /// Empty cells become JSON null.
    #[instrument(skip(self))]
    pub async fn get_all_query_records(&self, job_id: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut locator: Option<String> = None;

        loop {
            let page = self.get_query_results(job_id, locator.as_deref()).await?;
            parse_csv_page(&page.csv_data, &mut records)?;

            match page.locator {
                Some(next) => {
                    debug!(fetched = records.len(), "Fetching next result page");
                    locator = Some(next);
                }
                None => break,
            }
        }

        Ok(records)
    }

    /// Run a SOQL query as a Bulk API 2.0 job and return every row.
    ///
    /// A job that ends `Failed` or `Aborted` is an error carrying the job's
    /// own error message.
    #[instrument(skip(self, soql))]
    pub async fn query_records(&self, soql: &str) -> Result<Vec<Record>> {
        let job = self
            .create_query_job(CreateQueryJobRequest::new(soql))
            .await?;
        let job = self.wait_for_query_job(&job.id).await?;

        if !job.state.is_success() {
            return Err(Error::new(ErrorKind::Job {
                job_id: job.id,
                state: job.state.to_string(),
                message: job
                    .error_message
                    .unwrap_or_else(|| "no error message reported".to_string()),
            }));
        }

        self.get_all_query_records(&job.id).await
    }
}

fn parse_csv_page(csv_data: &str, out: &mut Vec<Record>) -> Result<()> {
    if csv_data.trim().is_empty() {
        return Ok(());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let headers = reader.headers()?.clone();

    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(cell.to_string())
                };
                (name.to_string(), value)
            })
            .collect();
        out.push(record);
    }

    Ok(())
}
