//! Command-line arguments.

use std::path::PathBuf;

use busbar_sf_pipeline::ExecMode;
use clap::{Parser, ValueEnum};

use crate::logging::LogLevel;

/// Query path for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum ExecType {
    /// Bulk API 2.0 query jobs
    Bulk,
    /// REST query API
    Normal,
}

impl From<ExecType> for ExecMode {
    fn from(exec: ExecType) -> Self {
        match exec {
            ExecType::Bulk => ExecMode::Bulk,
            ExecType::Normal => ExecMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sf-export",
    version,
    about = "Multi-worker Salesforce object export to CSV and Parquet"
)]
pub struct Cli {
    /// TOML file with Salesforce credentials and worker count
    pub config: PathBuf,

    /// JSON file listing the objects and fields to export
    pub schema: PathBuf,

    /// Query path used for every object
    #[arg(
        long,
        alias = "exec_type",
        value_enum,
        ignore_case = true,
        default_value_t = ExecType::Normal
    )]
    pub exec_type: ExecType,

    /// Log threshold
    #[arg(
        long,
        alias = "log_level",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    pub log_level: LogLevel,

    /// Directory for sf_export.log
    #[arg(long, alias = "log_path", default_value = "./logs")]
    pub log_path: PathBuf,

    /// Root for the csv/ and pq/ output directories
    #[arg(long, alias = "output_path", default_value = ".")]
    pub output_path: PathBuf,
}
