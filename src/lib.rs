//! # busbar-sf-export
//!
//! Export Salesforce objects to CSV and Parquet with a fixed number of
//! concurrent workers.
//!
//! A run reads a TOML config (credentials and worker count) and a JSON list
//! of objects, logs in with username, password and security token, then
//! hands every object to the extraction pipeline. Each object lands in
//! `<output>/csv/<Object>.csv` and `<output>/pq/<Object>.parquet`.
//!
//! ## Crates
//!
//! - **busbar-sf-client** - HTTP transport and SOQL query paging
//! - **busbar-sf-auth** - Password login and session credentials
//! - **busbar-sf-bulk** - Bulk API 2.0 query jobs
//! - **busbar-sf-pipeline** - Type coercion, CSV/Parquet output, bounded worker pool
//!
//! ## Failure policy
//!
//! Missing input files, invalid config, and login or connection failures
//! stop the run with an [`Error`]. A failure while exporting one object is
//! logged and counted in the [`RunSummary`]; the other objects carry on.

pub mod cli;
pub mod config;
mod error;
pub mod logging;
mod run;

pub use busbar_sf_auth as auth;
pub use busbar_sf_bulk as bulk;
pub use busbar_sf_client as client;
pub use busbar_sf_pipeline as pipeline;

pub use busbar_sf_pipeline::RunSummary;
pub use cli::{Cli, ExecType};
pub use config::ExportConfig;
pub use error::{Error, ErrorKind, Result};
pub use logging::LogLevel;
pub use run::run;
