//! CSV and Parquet output.
//!
//! Each object gets `<csv_dir>/<Object>.csv` and `<parquet_dir>/<Object>.parquet`.
//! Both files are staged as hidden temporaries in their target directory and
//! renamed into place only once both encodes have succeeded.
//!
//! Renames for the same object never interleave, so duplicate object names
//! end with a CSV and a Parquet file from the same task. If the second rename
//! fails, the CSV this task just placed is removed. A duplicate that
//! committed earlier has already had its CSV replaced and keeps only its
//! Parquet file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::coerce::{Column, Scalar, TypedTable};
use crate::error::{Error, Result};
use crate::schema::FieldType;

/// Held across the two renames of one commit.
static COMMIT_LOCK: Mutex<()> = Mutex::new(());

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const CSV_DIR: &str = "csv";
const PARQUET_DIR: &str = "pq";

/// Where a run writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    csv_dir: PathBuf,
    parquet_dir: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`: `root/csv` and `root/pq`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            csv_dir: root.join(CSV_DIR),
            parquet_dir: root.join(PARQUET_DIR),
        }
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    pub fn parquet_dir(&self) -> &Path {
        &self.parquet_dir
    }

    pub fn csv_path(&self, object: &str) -> PathBuf {
        self.csv_dir.join(format!("{object}.csv"))
    }

    pub fn parquet_path(&self, object: &str) -> PathBuf {
        self.parquet_dir.join(format!("{object}.parquet"))
    }

    /// Wipe and recreate both output directories.
    ///
    /// Called once per run, before any task is submitted.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.csv_dir, &self.parquet_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
            fs::create_dir_all(dir)?;
            debug!(dir = %dir.display(), "Prepared output directory");
        }
        Ok(())
    }
}

/// Paths produced for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub csv: PathBuf,
    pub parquet: PathBuf,
    pub rows: usize,
}

/// Write `table` in both formats. On error nothing is left behind.
pub fn write_table(layout: &OutputLayout, table: &TypedTable) -> Result<WrittenFiles> {
    let mut csv_tmp = staging_file(layout.csv_dir())?;
    write_csv(csv_tmp.as_file_mut(), table)?;

    let batch = to_record_batch(table)?;
    let mut parquet_tmp = staging_file(layout.parquet_dir())?;
    write_parquet(parquet_tmp.as_file_mut(), &batch)?;

    let csv = layout.csv_path(table.object());
    let parquet = layout.parquet_path(table.object());

    {
        let _commit = COMMIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        csv_tmp.persist(&csv).map_err(|e| Error::from(e.error))?;
        if let Err(e) = parquet_tmp.persist(&parquet) {
            let _ = fs::remove_file(&csv);
            return Err(Error::from(e.error));
        }
    }

    debug!(
        object = %table.object(),
        rows = table.num_rows(),
        csv = %csv.display(),
        parquet = %parquet.display(),
        "Wrote output files"
    );

    Ok(WrittenFiles {
        csv,
        parquet,
        rows: table.num_rows(),
    })
}

fn staging_file(dir: &Path) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(dir)?)
}

fn write_csv<W: std::io::Write>(out: W, table: &TypedTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.column_names())?;

    let columns = table.columns();
    for row in 0..table.num_rows() {
        writer.write_record(columns.iter().map(|c| csv_cell(&c.values[row])))?;
    }

    writer.flush()?;
    Ok(())
}

fn csv_cell(value: &Scalar) -> String {
    match value {
        Scalar::Null => String::new(),
        Scalar::String(s) => s.clone(),
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
        Scalar::Float(f) => f.to_string(),
        Scalar::Boolean(b) => b.to_string(),
        Scalar::Date(d) => d.format("%Y-%m-%d").to_string(),
        Scalar::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    }
}

fn write_parquet<W: std::io::Write + Send>(out: W, batch: &RecordBatch) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(out, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Arrow type a declared field type is stored as.
pub fn arrow_type(ty: FieldType) -> DataType {
    match ty {
        FieldType::String => DataType::Utf8,
        FieldType::Integer => DataType::Int64,
        FieldType::Float => DataType::Float64,
        FieldType::Boolean => DataType::Boolean,
        FieldType::Date => DataType::Date32,
        FieldType::DateTime => DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
    }
}

/// Arrow schema for a table; every column is nullable.
pub fn arrow_schema(table: &TypedTable) -> Schema {
    Schema::new(
        table
            .columns()
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(c.field_type), true))
            .collect::<Vec<_>>(),
    )
}

/// Convert a table to a single record batch.
pub fn to_record_batch(table: &TypedTable) -> Result<RecordBatch> {
    let arrays = table.columns().iter().map(to_array).collect::<Vec<_>>();
    Ok(RecordBatch::try_new(Arc::new(arrow_schema(table)), arrays)?)
}

fn to_array(column: &Column) -> ArrayRef {
    let values = &column.values;
    match column.field_type {
        FieldType::String => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        FieldType::Integer => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        FieldType::Float => Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Float(f) => Some(*f),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        FieldType::Boolean => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        FieldType::Date => Arc::new(Date32Array::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        FieldType::DateTime => Arc::new(
            TimestampMillisecondArray::from(
                values
                    .iter()
                    .map(|v| match v {
                        Scalar::DateTime(dt) => Some(dt.timestamp_millis()),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
    }
}
