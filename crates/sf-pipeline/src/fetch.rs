//! Row fetching: one SOQL query per object.

use std::future::Future;
use std::time::Duration;

use busbar_sf_bulk::BulkApiClient;
use busbar_sf_client::security::soql;
use busbar_sf_client::SalesforceClient;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::schema::ObjectSpec;

/// One record as returned by the API.
pub type RawRecord = Map<String, Value>;

/// All records for one object, in API order.
pub type RawRecordSet = Vec<RawRecord>;

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// The object has no rows.
    Empty,
    /// At least one record.
    Records(RawRecordSet),
}

impl Fetched {
    /// Wrap a record list, mapping an empty list to [`Fetched::Empty`].
    pub fn from_records(records: RawRecordSet) -> Self {
        if records.is_empty() {
            Fetched::Empty
        } else {
            Fetched::Records(records)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Fetched::Empty => 0,
            Fetched::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of raw records for one object.
///
/// Implementations are shared by every worker of a run, so they must be
/// safe to call concurrently.
pub trait RowFetcher: Send + Sync + 'static {
    fn fetch(&self, spec: &ObjectSpec) -> impl Future<Output = Result<Fetched>> + Send;
}

/// Build `SELECT f1, f2, ... FROM Object` in declaration order.
pub fn build_query(spec: &ObjectSpec) -> Result<String> {
    soql::build_select(&spec.name, &spec.field_names()).ok_or_else(|| {
        Error::new(ErrorKind::InvalidSpec {
            object: spec.name.clone(),
            message: "cannot build a query from the declared names".to_string(),
        })
    })
}

/// Query path used for every object in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Bulk API 2.0 query jobs.
    Bulk,
    /// REST query with `nextRecordsUrl` paging.
    #[default]
    Normal,
}

impl ExecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Bulk => "BULK",
            ExecMode::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for ExecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Production fetcher over an authenticated [`SalesforceClient`].
#[derive(Debug, Clone)]
pub struct SoqlFetcher {
    client: SalesforceClient,
    bulk: BulkApiClient,
    mode: ExecMode,
}

impl SoqlFetcher {
    pub fn new(client: SalesforceClient, mode: ExecMode) -> Self {
        let bulk = BulkApiClient::from_client(client.clone());
        Self { client, bulk, mode }
    }

    /// How often bulk jobs are polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.bulk = self.bulk.with_poll_interval(interval);
        self
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }
}

impl RowFetcher for SoqlFetcher {
    async fn fetch(&self, spec: &ObjectSpec) -> Result<Fetched> {
        let query = build_query(spec)?;
        debug!(object = %spec.name, mode = %self.mode, query = %query, "Running query");

        let records = match self.mode {
            ExecMode::Normal => self
                .client
                .query_all::<RawRecord>(&query)
                .await
                .map_err(|e| Error::fetch(&spec.name, e))?,
            ExecMode::Bulk => self
                .bulk
                .query_records(&query)
                .await
                .map_err(|e| Error::fetch(&spec.name, e))?,
        };

        Ok(Fetched::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account() -> ObjectSpec {
        ObjectSpec::new(
            "Account",
            vec![FieldSpec::new("Name", "str"), FieldSpec::new("Id", "str")],
        )
    }

    #[test]
    fn test_build_query_keeps_field_order() {
        assert_eq!(build_query(&account()).unwrap(), "SELECT Name, Id FROM Account");
    }

    #[test]
    fn test_build_query_rejects_bad_identifier() {
        let spec = ObjectSpec::new("Account", vec![FieldSpec::new("Name'--", "str")]);
        assert!(matches!(
            build_query(&spec).unwrap_err().kind,
            ErrorKind::InvalidSpec { .. }
        ));
    }

    #[test]
    fn test_fetched_from_records() {
        assert_eq!(Fetched::from_records(vec![]), Fetched::Empty);
        let fetched = Fetched::from_records(vec![RawRecord::new()]);
        assert_eq!(fetched.len(), 1);
        assert!(!fetched.is_empty());
    }

    #[tokio::test]
    async fn test_normal_mode_fetch() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query"))
            .and(query_param("q", "SELECT Name, Id FROM Account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 1,
                "done": true,
                "records": [{
                    "attributes": {"type": "Account", "url": "/services/data/v62.0/sobjects/Account/001A"},
                    "Name": "Acme",
                    "Id": "001A"
                }]
            })))
            .mount(&server)
            .await;

        let client = SalesforceClient::new(server.uri(), "tok").unwrap();
        let fetcher = SoqlFetcher::new(client, ExecMode::Normal);

        match fetcher.fetch(&account()).await.unwrap() {
            Fetched::Records(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0]["Name"], "Acme");
            }
            Fetched::Empty => panic!("expected records"),
        }
    }

    #[tokio::test]
    async fn test_normal_mode_empty_result() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalSize": 0,
                "done": true,
                "records": []
            })))
            .mount(&server)
            .await;

        let client = SalesforceClient::new(server.uri(), "tok").unwrap();
        let fetched = SoqlFetcher::new(client, ExecMode::Normal)
            .fetch(&account())
            .await
            .unwrap();
        assert_eq!(fetched, Fetched::Empty);
    }

    #[tokio::test]
    async fn test_fetch_error_is_tagged_with_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([{
                "errorCode": "INVALID_FIELD",
                "message": "No such column 'Name' on entity 'Account'"
            }])))
            .mount(&server)
            .await;

        let client = SalesforceClient::new(server.uri(), "tok").unwrap();
        let err = SoqlFetcher::new(client, ExecMode::Normal)
            .fetch(&account())
            .await
            .unwrap_err();

        match &err.kind {
            ErrorKind::Fetch { object, message } => {
                assert_eq!(object, "Account");
                assert!(message.contains("INVALID_FIELD"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!(err.source.is_some());
    }

    #[tokio::test]
    async fn test_bulk_mode_fetch() {
        let server = MockServer::start().await;
        let job = serde_json::json!({"id": "750A", "operation": "query", "state": "JobComplete"});

        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750A/results"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("\"Name\",\"Id\"\n\"Acme\",\"001A\"\n"),
            )
            .mount(&server)
            .await;

        let client = SalesforceClient::new(server.uri(), "tok").unwrap();
        let fetcher = SoqlFetcher::new(client, ExecMode::Bulk)
            .with_poll_interval(Duration::from_millis(10));
        assert_eq!(fetcher.mode(), ExecMode::Bulk);

        let fetched = fetcher.fetch(&account()).await.unwrap();
        assert_eq!(fetched.len(), 1);
    }
}
