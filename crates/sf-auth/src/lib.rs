//! # sf-auth
//!
//! Salesforce session login for the export tools.
//!
//! Sessions are opened with the SOAP `login` call using a username, a
//! password and the user's security token. The returned session id is used
//! as a bearer token against the REST and Bulk APIs.
//!
//! ## Security
//!
//! - Passwords, security tokens and session ids are redacted in Debug output
//! - Tracing skips credential parameters
//! - SOAP faults are reported by code and message only
//!
//! ## Example
//!
//! ```rust,ignore
//! use busbar_sf_auth::{login_url_for_domain, Credentials, PasswordLogin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), busbar_sf_auth::Error> {
//!     let login = PasswordLogin::new("user@example.com", "hunter2", "SECURITYTOKEN");
//!     let creds = login.authenticate(&login_url_for_domain("login")).await?;
//!     println!("connected to {}", creds.instance_url());
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;
mod login;

pub use credentials::{Credentials, SalesforceCredentials};
pub use error::{Error, ErrorKind, Result};
pub use login::{login_url_for_domain, PasswordLogin};

/// Default Salesforce login URL for production.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";
