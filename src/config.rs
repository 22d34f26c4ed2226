//! Run configuration loaded from a TOML file.
//!
//! ```toml
//! [salesforce]
//! username = "export@acme.com"
//! password = "hunter2"
//! token = "XXXXXXXXXXXXXXXXXXXX"
//! domain = "login"
//!
//! [proc]
//! threads = 4
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use busbar_sf_auth::login_url_for_domain;
use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

const DEFAULT_BULK_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Everything a run needs besides the CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    pub salesforce: SalesforceConfig,
    pub proc: ProcConfig,
}

/// Connection credentials.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SalesforceConfig {
    pub username: String,
    pub password: String,
    /// Security token appended to the password. Empty for orgs that
    /// trust the caller's IP range.
    #[serde(default)]
    pub token: String,
    /// `login`, `test`, a My Domain prefix, or a full login URL.
    pub domain: String,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl std::fmt::Debug for SalesforceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl SalesforceConfig {
    /// Login endpoint derived from `domain`.
    pub fn login_url(&self) -> String {
        login_url_for_domain(&self.domain)
    }
}

/// Worker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcConfig {
    pub threads: usize,
    #[serde(default)]
    pub bulk_poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl ProcConfig {
    /// Worker budget. Only valid after [`ExportConfig::validate`].
    pub fn workers(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.threads)
    }

    pub fn bulk_poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.bulk_poll_interval_secs
                .unwrap_or(DEFAULT_BULK_POLL_INTERVAL_SECS),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

impl ExportConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::MissingInput(path.display().to_string())
            } else {
                ErrorKind::Config(format!("cannot read {}", path.display()))
            };
            Error::with_source(kind, e)
        })?;
        Self::parse(&text)
    }

    /// Parse and validate config text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| Err(Error::new(ErrorKind::Config(message.to_string())));

        let sf = &self.salesforce;
        if sf.username.trim().is_empty() {
            return invalid("salesforce.username is empty");
        }
        if sf.password.is_empty() {
            return invalid("salesforce.password is empty");
        }
        if sf.domain.trim().is_empty() {
            return invalid("salesforce.domain is empty");
        }
        if matches!(&sf.api_version, Some(v) if v.trim().is_empty()) {
            return invalid("salesforce.api_version is empty");
        }
        if self.proc.threads == 0 {
            return invalid("proc.threads must be at least 1");
        }
        if self.proc.bulk_poll_interval_secs == Some(0) {
            return invalid("proc.bulk_poll_interval_secs must be at least 1");
        }
        if self.proc.request_timeout_secs == Some(0) {
            return invalid("proc.request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
