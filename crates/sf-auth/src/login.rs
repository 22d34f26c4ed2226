//! Username + password + security token login via the SOAP partner API.

use std::time::Duration;

use busbar_sf_client::security::xml;
use busbar_sf_client::{ClientConfig, SfHttpClient, DEFAULT_API_VERSION, USER_AGENT};
use tracing::{debug, instrument};

use crate::credentials::SalesforceCredentials;
use crate::error::{Error, ErrorKind, Result};

/// Resolve the login URL for a configured domain.
///
/// `login` and `test` pick the production and sandbox hosts; any other
/// value is treated as a My Domain prefix. A value that already looks like
/// a URL is used as is.
///
/// ```rust
/// use busbar_sf_auth::login_url_for_domain;
///
/// assert_eq!(login_url_for_domain("test"), "https://test.salesforce.com");
/// assert_eq!(login_url_for_domain("acme.my"), "https://acme.my.salesforce.com");
/// assert_eq!(login_url_for_domain("http://localhost:8080/"), "http://localhost:8080");
/// ```
pub fn login_url_for_domain(domain: &str) -> String {
    let domain = domain.trim();
    if domain.starts_with("http://") || domain.starts_with("https://") {
        return domain.trim_end_matches('/').to_string();
    }
    let domain = domain.trim_end_matches(".salesforce.com");
    if domain.is_empty() {
        return crate::PRODUCTION_LOGIN_URL.to_string();
    }
    format!("https://{}.salesforce.com", domain)
}

/// Session login with a username, password and security token.
///
/// Salesforce expects the security token appended to the password; that
/// happens when the envelope is built, never in logs.
#[derive(Clone)]
pub struct PasswordLogin {
    username: String,
    password: String,
    security_token: String,
    api_version: String,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for PasswordLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordLogin")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PasswordLogin {
    /// Create a new password login.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        security_token: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            security_token: security_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: None,
        }
    }

    /// Set the API version used for the login endpoint and the session.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Bound the login request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The username this login authenticates as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Open a session against the given login URL.
    ///
    /// Returns credentials whose instance URL is the scheme and host of the
    /// `serverUrl` Salesforce hands back.
    #[instrument(skip(self), fields(username = %self.username))]
    pub async fn authenticate(&self, login_url: &str) -> Result<SalesforceCredentials> {
        if self.username.trim().is_empty() {
            return Err(Error::new(ErrorKind::InvalidCredentials(
                "username is empty".to_string(),
            )));
        }

        let endpoint = format!(
            "{}/services/Soap/u/{}",
            login_url.trim_end_matches('/'),
            self.api_version
        );

        debug!(endpoint = %endpoint, "Authenticating with SOAP login");

        let mut config = ClientConfig::builder();
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        let client = SfHttpClient::new(config.build())?;

        let request = client
            .post(&endpoint)
            .header("SOAPAction", "login")
            .xml(self.envelope());
        let response = client.send(request).await?;

        let status = response.status();
        let body = response.text().await?;

        // Faults come back as HTTP 500 with a SOAP body
        if let Some(code) = extract_element(&body, "faultcode") {
            let message = extract_element(&body, "faultstring").unwrap_or_default();
            return Err(Error::new(ErrorKind::LoginFault {
                code,
                message: xml::unescape(&message),
            }));
        }

        if !(200..300).contains(&status) {
            return Err(Error::new(ErrorKind::Http(format!(
                "login endpoint returned {}",
                status
            ))));
        }

        self.parse_login_response(&body)
    }

    fn envelope(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"
        xmlns:urn="urn:partner.soap.sforce.com">
    <env:Header>
        <urn:CallOptions>
            <urn:client>{client}</urn:client>
        </urn:CallOptions>
    </env:Header>
    <env:Body>
        <n1:login xmlns:n1="urn:partner.soap.sforce.com">
            <n1:username>{username}</n1:username>
            <n1:password>{password}{token}</n1:password>
        </n1:login>
    </env:Body>
</env:Envelope>"#,
            client = xml::escape(USER_AGENT),
            username = xml::escape(&self.username),
            password = xml::escape(&self.password),
            token = xml::escape(&self.security_token),
        )
    }

    fn parse_login_response(&self, body: &str) -> Result<SalesforceCredentials> {
        let session_id = extract_element(body, "sessionId").ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse("missing sessionId".to_string()))
        })?;
        let server_url = extract_element(body, "serverUrl").ok_or_else(|| {
            Error::new(ErrorKind::InvalidResponse("missing serverUrl".to_string()))
        })?;

        let instance_url = instance_url_from_server_url(&xml::unescape(&server_url))?;

        let mut creds = SalesforceCredentials::new(instance_url, session_id, &self.api_version);
        if let Some(user_id) = extract_element(body, "userId") {
            creds = creds.with_user_id(user_id);
        }
        Ok(creds)
    }
}

/// `https://na1.salesforce.com/services/Soap/u/62.0/00D...` -> `https://na1.salesforce.com`
fn instance_url_from_server_url(server_url: &str) -> Result<String> {
    let parsed = url::Url::parse(server_url.trim())?;
    let host = parsed.host_str().ok_or_else(|| {
        Error::new(ErrorKind::InvalidResponse(
            "serverUrl has no host".to_string(),
        ))
    })?;
    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// Extract the text of the first leaf element with the given local name,
/// with or without a namespace prefix.
fn extract_element(xml: &str, tag: &str) -> Option<String> {
    let start_patterns = [
        format!("<{}>", tag),
        format!("<sf:{}>", tag),
        format!("<soapenv:{}>", tag),
    ];

    for start in &start_patterns {
        if let Some(start_idx) = xml.find(start.as_str()) {
            let content_start = start_idx + start.len();
            let rest = &xml[content_start..];
            if let Some(end_idx) = rest.find("</") {
                return Some(rest[..end_idx].trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn login_ok_body(server: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <loginResponse>
      <result>
        <metadataServerUrl>{server}/services/Soap/m/62.0/00Dxx0000001gEH</metadataServerUrl>
        <passwordExpired>false</passwordExpired>
        <sandbox>false</sandbox>
        <serverUrl>{server}/services/Soap/u/62.0/00Dxx0000001gEH</serverUrl>
        <sessionId>00Dxx0000001gEH!AQcAQH0dMHZfz972</sessionId>
        <userId>005xx000001Sv6eAAC</userId>
      </result>
    </loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#
        )
    }

    const INVALID_LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:sf="urn:fault.partner.soap.sforce.com">
  <soapenv:Body>
    <soapenv:Fault>
      <faultcode>sf:INVALID_LOGIN</faultcode>
      <faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring>
    </soapenv:Fault>
  </soapenv:Body>
</soapenv:Envelope>"#;

    #[test]
    fn test_login_url_for_domain() {
        assert_eq!(login_url_for_domain("login"), "https://login.salesforce.com");
        assert_eq!(login_url_for_domain("test"), "https://test.salesforce.com");
        assert_eq!(
            login_url_for_domain("acme.my.salesforce.com"),
            "https://acme.my.salesforce.com"
        );
        assert_eq!(login_url_for_domain(""), crate::PRODUCTION_LOGIN_URL);
        assert_eq!(
            login_url_for_domain("https://acme.my.salesforce.com/"),
            "https://acme.my.salesforce.com"
        );
    }

    #[test]
    fn test_envelope_escapes_and_appends_token() {
        let login = PasswordLogin::new("a&b@example.com", "p<w>", "TOK'EN");
        let envelope = login.envelope();
        assert!(envelope.contains("<n1:username>a&amp;b@example.com</n1:username>"));
        assert!(envelope.contains("<n1:password>p&lt;w&gt;TOK&apos;EN</n1:password>"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let login = PasswordLogin::new("user@example.com", "hunter2", "SECRETTOKEN");
        let debug = format!("{login:?}");
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("SECRETTOKEN"));
    }

    #[test]
    fn test_instance_url_from_server_url() {
        assert_eq!(
            instance_url_from_server_url("https://na1.salesforce.com/services/Soap/u/62.0/00D")
                .unwrap(),
            "https://na1.salesforce.com"
        );
        assert_eq!(
            instance_url_from_server_url("http://127.0.0.1:4321/services/Soap/u/62.0/00D")
                .unwrap(),
            "http://127.0.0.1:4321"
        );
        assert!(instance_url_from_server_url("not a url").is_err());
    }

    #[test]
    fn test_extract_element_handles_prefixes() {
        let xml = "<a><sf:exceptionCode>X</sf:exceptionCode><faultcode> sf:Y </faultcode></a>";
        assert_eq!(extract_element(xml, "exceptionCode"), Some("X".to_string()));
        assert_eq!(extract_element(xml, "faultcode"), Some("sf:Y".to_string()));
        assert_eq!(extract_element(xml, "missing"), None);
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/62.0"))
            .and(header("SOAPAction", "login"))
            .and(header("Content-Type", "text/xml; charset=UTF-8"))
            .and(header("User-Agent", USER_AGENT))
            .and(body_string_contains("<n1:password>pwTOKEN</n1:password>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_ok_body(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let creds = PasswordLogin::new("user@example.com", "pw", "TOKEN")
            .authenticate(&server.uri())
            .await
            .unwrap();

        assert_eq!(creds.instance_url(), server.uri());
        assert_eq!(creds.access_token(), "00Dxx0000001gEH!AQcAQH0dMHZfz972");
        assert_eq!(creds.api_version(), "62.0");
        assert_eq!(creds.user_id(), Some("005xx000001Sv6eAAC"));
    }

    #[tokio::test]
    async fn test_authenticate_uses_configured_api_version() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/59.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_ok_body(&server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        let creds = PasswordLogin::new("user@example.com", "pw", "TOKEN")
            .with_api_version("59.0")
            .authenticate(&server.uri())
            .await
            .unwrap();

        assert_eq!(creds.api_version(), "59.0");
    }

    #[tokio::test]
    async fn test_authenticate_invalid_login_fault() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/62.0"))
            .respond_with(ResponseTemplate::new(500).set_body_string(INVALID_LOGIN_FAULT))
            .mount(&server)
            .await;

        let err = PasswordLogin::new("user@example.com", "wrong", "TOKEN")
            .authenticate(&server.uri())
            .await
            .unwrap_err();

        assert!(err.is_invalid_login());
        match err.kind {
            ErrorKind::LoginFault { code, message } => {
                assert_eq!(code, "sf:INVALID_LOGIN");
                assert!(message.contains("Invalid username"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authenticate_non_soap_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = PasswordLogin::new("user@example.com", "pw", "TOKEN")
            .authenticate(&server.uri())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Http(_)));
    }

    #[tokio::test]
    async fn test_authenticate_missing_session_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<result></result>"))
            .mount(&server)
            .await;

        let err = PasswordLogin::new("user@example.com", "pw", "TOKEN")
            .authenticate(&server.uri())
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_empty_username() {
        let err = PasswordLogin::new("  ", "pw", "TOKEN")
            .authenticate("http://127.0.0.1:1")
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidCredentials(_)));
    }
}
