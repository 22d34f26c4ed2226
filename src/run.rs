//! One export run, from input files to written outputs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use busbar_sf_auth::{Credentials, PasswordLogin, SalesforceCredentials};
use busbar_sf_client::{ClientConfig, SalesforceClient};
use busbar_sf_pipeline::{
    load_object_specs, ExecMode, ExtractionPipeline, OutputLayout, RunSummary, SoqlFetcher,
};
use tracing::{info, instrument, warn};

use crate::cli::Cli;
use crate::config::{ExportConfig, SalesforceConfig};
use crate::error::{Error, ErrorKind, Result};

/// Run an export.
///
/// Returns an error only for fatal conditions: a missing or invalid input
/// file, a rejected login, or a connection failure. Objects that fail to
/// export are counted in the returned summary.
pub async fn run(cli: &Cli) -> Result<RunSummary> {
    let started = Instant::now();

    for input in [&cli.config, &cli.schema] {
        if !input.is_file() {
            return Err(Error::new(ErrorKind::MissingInput(
                input.display().to_string(),
            )));
        }
    }

    let config = ExportConfig::from_file(&cli.config)?;
    let specs = load_object_specs(&cli.schema)?;
    let mode = ExecMode::from(cli.exec_type);
    let workers = config.proc.workers().ok_or_else(|| {
        Error::new(ErrorKind::Config("proc.threads must be at least 1".to_string()))
    })?;

    info!(
        objects = specs.len(),
        mode = %mode,
        workers = workers.get(),
        "Starting export"
    );

    let credentials = login(&config.salesforce, config.proc.request_timeout()).await?;
    let client = SalesforceClient::with_config(
        credentials.instance_url(),
        credentials.access_token(),
        ClientConfig::builder()
            .with_timeout(config.proc.request_timeout())
            .with_pool_max_idle(workers.get())
            .build(),
    )?
    .with_api_version(credentials.api_version());

    let layout = OutputLayout::new(&cli.output_path);
    layout.prepare()?;

    let fetcher = SoqlFetcher::new(client, mode).with_poll_interval(config.proc.bulk_poll_interval());
    let pipeline = ExtractionPipeline::new(Arc::new(fetcher), layout, workers);
    let outcomes = pipeline.run(specs).await?;

    let summary = RunSummary::from_outcomes(&outcomes);
    if summary.failed > 0 {
        warn!(objects = ?summary.failed_objects, "Some objects were not exported");
    }
    info!(
        summary = %summary,
        elapsed = %format_elapsed(started.elapsed()),
        "Export finished"
    );

    Ok(summary)
}

#[instrument(skip(config), fields(username = %config.username))]
async fn login(config: &SalesforceConfig, timeout: Duration) -> Result<SalesforceCredentials> {
    let mut login = PasswordLogin::new(&config.username, &config.password, &config.token)
        .with_timeout(timeout);
    if let Some(version) = &config.api_version {
        login = login.with_api_version(version);
    }

    let credentials = login.authenticate(&config.login_url()).await?;
    info!(instance_url = %credentials.instance_url(), "Logged in");
    Ok(credentials)
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}
