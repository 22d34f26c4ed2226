//! # busbar-sf-bulk
//!
//! Salesforce Bulk API 2.0 query jobs.
//!
//! A query job is created from a SOQL statement, polled until it reaches a
//! terminal state, and its CSV result pages are downloaded by following the
//! `Sforce-Locator` header. Rows come back as JSON maps so they can go
//! through the same coercion as REST query results.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use busbar_sf_bulk::BulkApiClient;
//! use busbar_sf_client::SalesforceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), busbar_sf_bulk::Error> {
//!     let session = SalesforceClient::new("https://myorg.my.salesforce.com", "access_token")?;
//!     let client = BulkApiClient::from_client(session)
//!         .with_poll_interval(Duration::from_secs(2));
//!
//!     let rows = client.query_records("SELECT Id, Name FROM Account").await?;
//!     println!("Retrieved {} records", rows.len());
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::BulkApiClient;
pub use error::{Error, ErrorKind, Result};
pub use types::{CreateQueryJobRequest, JobState, QueryJob, QueryOperation, QueryResults, Record};
