//! Connection configuration.
//!
//! This module validates everything a connection needs before its first call: the
//! application identifier, the normalized base URL, the signing scheme and the
//! credentials that scheme requires.

use crate::client::{ClientConfig, DEFAULT_REQUEST_TIMEOUT, LOGIN_TIMEOUT};
use crate::types::SigningScheme;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;
use url::Url;
use validator::{Validate, ValidationError};

/// Path segment every API base URL ends with.
pub const API_SEGMENT: &str = "api/";

/// Configuration for a connection to the IPAM service.
#[derive(Debug, Validate)]
pub struct ConnectionConfig {
    /// Normalized base URL, always ending in `api/`
    #[validate(url)]
    base_url: String,

    /// Application identifier configured on the server
    #[validate(length(min = 3, max = 12), custom(function = "validate_app_id"))]
    app_id: String,

    scheme: SigningScheme,
    username: String,
    password: SecretString,
    api_key: Option<SecretString>,

    /// Whether to verify TLS certificates
    tls_verify: bool,

    /// Login timeout in seconds
    #[validate(range(min = 1, max = 300))]
    login_timeout_secs: u64,

    /// Timeout for ordinary calls in seconds
    #[validate(range(min = 1, max = 300))]
    request_timeout_secs: u64,

    http: ClientConfig,
}

fn validate_app_id(app_id: &str) -> std::result::Result<(), ValidationError> {
    if app_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("app_id_not_alphanumeric"))
    }
}

impl ConnectionConfig {
    /// Creates a configuration for the given server, application and scheme.
    ///
    /// The base URL is normalized for the scheme (see [`normalize_base_url`]).
    /// Credentials are supplied with [`Self::with_credentials`] or [`Self::with_api_key`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is malformed or the application id is
    /// not 3 to 12 alphanumeric characters.
    pub fn new(
        base_url: impl AsRef<str>,
        app_id: impl Into<String>,
        scheme: SigningScheme,
    ) -> Result<Self> {
        let config = Self {
            base_url: normalize_base_url(base_url.as_ref(), scheme)?,
            app_id: app_id.into(),
            scheme,
            username: String::new(),
            password: SecretString::from(String::new()),
            api_key: None,
            tls_verify: false,
            login_timeout_secs: LOGIN_TIMEOUT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT,
            http: ClientConfig::new(),
        };

        config
            .validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Set the username and password used to log in.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = SecretString::from(password.into());
        self
    }

    /// Set the shared secret key used to encrypt payloads.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Override the login timeout in seconds.
    #[must_use]
    pub const fn with_login_timeout_secs(mut self, seconds: u64) -> Self {
        self.login_timeout_secs = seconds;
        self
    }

    /// Override the timeout for ordinary calls in seconds.
    #[must_use]
    pub const fn with_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Override the HTTP client tuning.
    #[must_use]
    pub fn with_http_config(mut self, http: ClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL all token-signed requests are built on: the base URL plus the application id.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}{}", self.base_url, add_trailing_slash(&self.app_id))
    }

    /// Application identifier.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Active signing scheme.
    #[must_use]
    pub const fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    /// Login username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Shared secret key, if configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Login timeout.
    #[must_use]
    pub const fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Timeout for ordinary calls.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// HTTP client tuning with the configured request timeout applied.
    #[must_use]
    pub fn http_config(&self) -> ClientConfig {
        self.http.clone().with_timeout(self.request_timeout())
    }

    /// Checks that the credentials the signing scheme needs are present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required credential is empty.
    pub fn check_credentials(&self) -> Result<()> {
        match self.scheme {
            SigningScheme::TlsToken => {
                if self.username.is_empty() || self.password.expose_secret().is_empty() {
                    return Err(Error::ConfigError(
                        "Username and password can't be empty".to_string(),
                    ));
                }
            }
            SigningScheme::SharedSecret | SigningScheme::Both => {
                let missing = self
                    .api_key
                    .as_ref()
                    .map_or(true, |key| key.expose_secret().is_empty());
                if missing {
                    return Err(Error::ConfigError("Invalid api key".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Re-validates every setting, including builder overrides, and the credentials.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first problem found.
    pub fn verify(&self) -> Result<()> {
        self.validate()?;
        self.check_credentials()
    }
}

/// Normalizes a base URL for a signing scheme.
///
/// Strips any existing scheme, forces `https://` (token and combined schemes) or
/// `http://` (shared secret), ensures a trailing slash and appends `api/` when the
/// URL does not already end with it. Normalizing a normalized URL is a no-op.
///
/// # Errors
///
/// Returns a configuration error if the result is not a well-formed URL.
pub fn normalize_base_url(url: &str, scheme: SigningScheme) -> Result<String> {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .find("//")
        .map_or(trimmed, |idx| &trimmed[idx + 2..]);

    if without_scheme.is_empty()
        || without_scheme.starts_with('/')
        || without_scheme.chars().any(char::is_whitespace)
    {
        return Err(Error::ConfigError(format!(
            "The given url is corrupted: `{url}`"
        )));
    }

    let mut normalized = add_trailing_slash(&format!("{}{without_scheme}", scheme.url_scheme()));
    if !normalized.ends_with(API_SEGMENT) {
        normalized.push_str(API_SEGMENT);
    }

    let parsed = Url::parse(&normalized)
        .map_err(|e| Error::ConfigError(format!("The given url is corrupted: {e}")))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::ConfigError(format!(
            "The given url has no host: `{url}`"
        )));
    }

    debug!(url = %normalized, "normalized base url");
    Ok(normalized)
}

/// Appends a `/` unless the value already ends with one.
#[must_use]
pub fn add_trailing_slash(value: &str) -> String {
    if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    }
}
