//! # sf-client
//!
//! HTTP transport for the Salesforce export tools.
//!
//! This crate provides the client every other export crate talks through:
//! - Connection pooling and response compression (gzip, deflate)
//! - Salesforce error body decoding with credential sanitisation
//! - Request/response tracing
//! - SOQL query execution with `nextRecordsUrl` paging
//!
//! There is no retry layer: a failed request surfaces to the caller, and the
//! export pipeline decides what a failure means for one object.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │        (sf-auth, sf-bulk, sf-pipeline fetchers)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - Holds instance URL + session token + HTTP client         │
//! │  - Typed JSON methods (get_json, post_json)                 │
//! │  - SOQL query / query_all                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SfHttpClient                             │
//! │  - Raw HTTP with compression and rate limit detection       │
//! │  - Response error decoding                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use busbar_sf_client::SalesforceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), busbar_sf_client::Error> {
//!     let client = SalesforceClient::new("https://na1.salesforce.com", "00D...")?;
//!
//!     let accounts: Vec<serde_json::Map<String, serde_json::Value>> = client
//!         .query_all("SELECT Id, Name FROM Account")
//!         .await?;
//!
//!     println!("{} accounts", accounts.len());
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod request;
mod response;
mod salesforce_client;
pub mod security;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBuilder, RequestMethod};
pub use response::{Response, ResponseExt};
pub use salesforce_client::{QueryResult, SalesforceClient};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("busbar-sf-export/", env!("CARGO_PKG_VERSION"));
