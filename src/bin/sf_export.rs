//! Export Salesforce objects to CSV and Parquet.
//!
//! ```sh
//! sf-export config.toml objects.json --exec-type BULK --output-path ./export
//! ```

use std::process::ExitCode;

use anyhow::Context;
use busbar_sf_export::{logging, run, Cli};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level, &cli.log_path) {
        eprintln!("sf-export: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli).await.context("export aborted") {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
