//! # busbar-sf-pipeline
//!
//! Concurrent export of Salesforce objects to CSV and Parquet.
//!
//! One task runs per [`ObjectSpec`]: the [`RowFetcher`] pulls the declared
//! fields, [`coerce_records`] turns the raw records into a [`TypedTable`],
//! and [`write_table`] persists it under `csv/` and `pq/`. The
//! [`ExtractionPipeline`] runs those tasks under a fixed worker budget and
//! turns every failure into a [`TaskOutcome`] instead of aborting the run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use busbar_sf_pipeline::{
//!     load_object_specs, ExecMode, ExtractionPipeline, OutputLayout, SoqlFetcher,
//! };
//!
//! let specs = load_object_specs("objects.json")?;
//! let layout = OutputLayout::new("./export");
//! layout.prepare()?;
//!
//! let fetcher = Arc::new(SoqlFetcher::new(client, ExecMode::Bulk));
//! let pipeline = ExtractionPipeline::new(fetcher, layout, NonZeroUsize::new(4).unwrap());
//!
//! for outcome in pipeline.run(specs).await? {
//!     println!("{}: {:?}", outcome.object_name, outcome.status);
//! }
//! ```

pub mod coerce;
mod error;
pub mod fetch;
pub mod pipeline;
pub mod schema;
pub mod writer;

pub use coerce::{coerce_records, coerce_value, Column, Scalar, TypedTable, ENVELOPE_FIELD};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{build_query, ExecMode, Fetched, RawRecord, RawRecordSet, RowFetcher, SoqlFetcher};
pub use pipeline::{ExtractionPipeline, RunSummary, TaskOutcome, TaskStatus};
pub use schema::{
    load_object_specs, parse_object_specs, FieldSpec, FieldType, ObjectSpec, TypeTag,
};
pub use writer::{write_table, OutputLayout, WrittenFiles};
