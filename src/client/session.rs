use crate::client::endpoints::TrackerEndpoints;
use crate::error::{ExportError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const CLIENT_USER_AGENT: &str = concat!("jiradump/", env!("CARGO_PKG_VERSION"));

/// Anonymous tracker pages carry a login link; its presence is the signal
/// that the session must (re-)authenticate.
static LOGIN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="[^"]*login-link"#).expect("static pattern"));

/// Fetch capability consumed by the export pipeline. Implementations own the
/// authenticated session; callers never see an authentication round-trip,
/// only its failure.
pub trait WebClient {
    fn fetch_html(&self, url: &str) -> Result<String>;
    fn fetch_csv(&self, url: &str) -> Result<Vec<u8>>;
    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>>;
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Pre-baked session cookies, an alternative to the form login.
    pub cookies: Vec<(String, String)>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field(
                "cookies",
                &self
                    .cookies
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Credentials {
    pub fn parse_cookie_json(json: &str) -> Result<Vec<(String, String)>> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ExportError::Config {
                message: format!("Invalid cookie JSON: {}", e),
            })?;

        let object = value.as_object().ok_or_else(|| ExportError::Config {
            message: "Cookie JSON must be an object of name/value pairs".to_string(),
        })?;

        object
            .iter()
            .map(|(name, value)| {
                value
                    .as_str()
                    .map(|v| (name.clone(), v.to_string()))
                    .ok_or_else(|| ExportError::Config {
                        message: format!("Cookie '{}' must have a string value", name),
                    })
            })
            .collect()
    }
}

pub(crate) fn login_required_in(html: &str) -> bool {
    LOGIN_LINK.is_match(html)
}

/// Authenticated blocking HTTP session against one tracker. The cookie jar
/// is the only mutable state and is only written by the login handshake.
pub struct TrackerSession {
    http: Client,
    endpoints: TrackerEndpoints,
    credentials: Credentials,
}

impl TrackerSession {
    pub fn connect(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let endpoints = TrackerEndpoints::new(base_url)?;

        let jar = Arc::new(Jar::default());
        if !credentials.cookies.is_empty() {
            let base = Url::parse(endpoints.base())?;
            for (name, value) in &credentials.cookies {
                jar.add_cookie_str(&format!("{}={}", name, value), &base);
            }
        }

        let http = Client::builder()
            .cookie_provider(jar)
            .timeout(timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            endpoints,
            credentials,
        })
    }

    pub fn endpoints(&self) -> &TrackerEndpoints {
        &self.endpoints
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.username.as_deref()
    }

    fn get(&self, url: &str) -> Result<Response> {
        let response = self.http.get(url).send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(ExportError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    fn login_required(&self) -> Result<bool> {
        let body = self.get(self.endpoints.base())?.text()?;
        Ok(login_required_in(&body))
    }

    /// Submits the tracker's login form with the configured credentials.
    pub fn login(&self) -> Result<()> {
        // A cookie-only session that still gets asked to log in has nothing
        // left to offer.
        let password =
            self.credentials
                .password
                .as_deref()
                .ok_or_else(|| ExportError::Authentication {
                    url: self.endpoints.base().to_string(),
                })?;
        let username = self.credentials.username.as_deref().unwrap_or_default();

        let form = [
            ("os_username", username),
            ("os_password", password),
            ("os_destination", ""),
            ("user_role", ""),
            ("atl_token", ""),
            ("login", "Log In"),
        ];

        let url = self.endpoints.login_form();
        let response = self.http.post(&url).form(&form).send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(ExportError::Fetch {
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    /// Checks the session and performs the login handshake at most once.
    /// Still being asked to log in afterwards escalates instead of looping.
    pub fn ensure_logged_in(&self) -> Result<()> {
        if !self.login_required()? {
            return Ok(());
        }

        self.login()?;

        if self.login_required()? {
            return Err(ExportError::Authentication {
                url: self.endpoints.base().to_string(),
            });
        }

        Ok(())
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.ensure_logged_in()?;
        let response = self.get(url)?;
        Ok(response.bytes()?.to_vec())
    }
}

impl WebClient for TrackerSession {
    fn fetch_html(&self, url: &str) -> Result<String> {
        let bytes = self.fetch(url)?;
        Ok(String::from_utf8(bytes)?)
    }

    fn fetch_csv(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch(url)
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch(url)
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>> {
        self.ensure_logged_in()?;

        let response = self.http.post(url).form(form).send()?;
        let status = response.status();

        if !status.is_success() {
            return Err(ExportError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> Credentials {
        Credentials {
            username: Some("exporter".to_string()),
            password: Some("super-secret".to_string()),
            cookies: vec![("JSESSIONID".to_string(), "deadbeef".to_string())],
        }
    }

    #[test]
    fn test_login_marker_detection() {
        assert!(login_required_in(
            r#"<a class="login-link" href="/login.jsp">Log In</a>"#
        ));
        assert!(login_required_in(
            r#"<a class="aui-nav-link login-link" href="/login.jsp">Log In</a>"#
        ));
        assert!(!login_required_in(
            r#"<a class="logout-link" href="/logout">Log Out</a>"#
        ));
        assert!(!login_required_in("<html><body>Dashboard</body></html>"));
    }

    #[test]
    fn test_parse_cookie_json() {
        let cookies =
            Credentials::parse_cookie_json(r#"{"JSESSIONID": "abc", "atlassian.xsrf.token": "x"}"#)
                .unwrap();

        assert_eq!(cookies.len(), 2);
        assert!(cookies.contains(&("JSESSIONID".to_string(), "abc".to_string())));
    }

    #[test]
    fn test_parse_cookie_json_rejects_non_objects() {
        assert!(Credentials::parse_cookie_json("[1, 2]").is_err());
        assert!(Credentials::parse_cookie_json("not json").is_err());
        assert!(Credentials::parse_cookie_json(r#"{"k": 42}"#).is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_credentials());

        assert!(debug_output.contains("exporter"));
        assert!(debug_output.contains("JSESSIONID"));
        assert!(!debug_output.contains("super-secret"));
        assert!(!debug_output.contains("deadbeef"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_connect_rejects_invalid_base_url() {
        let result = TrackerSession::connect(
            "not a url",
            test_credentials(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ExportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_connect_builds_session() {
        let session = TrackerSession::connect(
            "https://jira.example.com/",
            test_credentials(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(session.endpoints().base(), "https://jira.example.com");
        assert_eq!(session.username(), Some("exporter"));
    }
}
