//! Connection state machine and request signing.
//!
//! Under the token scheme a connection logs in at initialization, re-logs in
//! transparently once its token has expired and deletes the session on
//! [`Connection::terminate`]. Under the shared-secret schemes every call is
//! self-contained: the payload is encrypted and no session exists.

use crate::crypt::SharedSecretCipher;
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Local, NaiveDateTime};
use ipam_core::config::add_trailing_slash;
use ipam_core::{Collection, ConnectionConfig, Error, Params, Response, SigningScheme};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Format of the token expiry timestamp sent by the server.
pub const EXPIRES_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Authentication state of a connection. `Debug` output never shows the token.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No session token held
    Unauthenticated,
    /// Logged in with a session token
    Authenticated {
        /// Session token sent with every call
        token: String,
        /// Local time after which the token must be renewed
        expires: Option<NaiveDateTime>,
    },
    /// Session deleted; the connection can no longer be used
    Terminated,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("Unauthenticated"),
            Self::Authenticated { expires, .. } => f
                .debug_struct("Authenticated")
                .field("token", &"[REDACTED]")
                .field("expires", expires)
                .finish(),
            Self::Terminated => f.write_str("Terminated"),
        }
    }
}

/// An authenticated connection to the IPAM service.
pub struct Connection {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    cipher: Option<SharedSecretCipher>,
    session: Mutex<SessionState>,
    resolve_defaults: RwLock<HashMap<Collection, bool>>,
}

impl Connection {
    /// Validates the configuration and, under the token scheme, logs in.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings or missing credentials,
    /// and a request error if the login is rejected.
    pub async fn initialize(
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        config.verify()?;

        let cipher = if config.scheme().encrypts_payload() {
            config.api_key().map(SharedSecretCipher::new)
        } else {
            None
        };

        let connection = Arc::new(Self {
            config,
            transport,
            cipher,
            session: Mutex::new(SessionState::Unauthenticated),
            resolve_defaults: RwLock::new(HashMap::new()),
        });

        if connection.config.scheme().uses_session() {
            connection.login().await?;
        }

        info!(
            url = %connection.config.base_url(),
            app_id = %connection.config.app_id(),
            scheme = connection.config.scheme().name(),
            "IPAM connection established"
        );
        Ok(connection)
    }

    /// Initializes a connection over a [`ReqwestTransport`] built from the configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::initialize`].
    pub async fn connect(config: ConnectionConfig) -> Result<Arc<Self>> {
        let transport = ReqwestTransport::for_config(&config)?;
        Self::initialize(config, Arc::new(transport)).await
    }

    /// Connection configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Active signing scheme.
    #[must_use]
    pub const fn scheme(&self) -> SigningScheme {
        self.config.scheme()
    }

    /// Snapshot of the session state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    /// Current session token, if logged in.
    pub async fn token(&self) -> Option<String> {
        match &*self.session.lock().await {
            SessionState::Authenticated { token, .. } => Some(token.clone()),
            _ => None,
        }
    }

    /// Expiry of the current session token, if logged in.
    pub async fn token_expires(&self) -> Option<NaiveDateTime> {
        match &*self.session.lock().await {
            SessionState::Authenticated { expires, .. } => *expires,
            _ => None,
        }
    }

    /// Whether references into `collection` resolve to objects when the caller
    /// does not say. Defaults to `true`.
    #[must_use]
    pub fn default_as_object(&self, collection: Collection) -> bool {
        self.resolve_defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .copied()
            .unwrap_or(true)
    }

    /// Sets the resolution default for references into `collection`.
    pub fn set_default_as_object(&self, collection: Collection, as_object: bool) {
        self.resolve_defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection, as_object);
    }

    /// Logs in with basic authentication and stores the returned session token.
    ///
    /// # Errors
    ///
    /// Returns a request error if the server rejects the login or omits the token,
    /// and a configuration error if the connection was terminated.
    pub async fn login(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if *session == SessionState::Terminated {
            return Err(terminated());
        }
        *session = self.authenticate().await?;
        Ok(())
    }

    /// Sends one call and returns the parsed envelope.
    ///
    /// `method` and `resource` are case-insensitive. `identifiers` become path
    /// segments under the token scheme and positional `id`, `id2`, ... keys under
    /// the shared-secret schemes. Extension methods such as `admins` are sent as-is.
    ///
    /// # Errors
    ///
    /// Returns a request error when the server reports failure, a configuration
    /// error after termination, and a transport error if no response arrives.
    pub async fn call(
        &self,
        method: &str,
        resource: &str,
        identifiers: &[&str],
        params: &Params,
    ) -> Result<Response> {
        let method = method.to_lowercase();
        let resource = resource.to_lowercase();

        let result = if self.scheme().encrypts_payload() {
            if *self.session.lock().await == SessionState::Terminated {
                Err(terminated())
            } else {
                self.call_encrypted(&method, &resource, identifiers, params)
                    .await
            }
        } else {
            match self.check_token().await {
                Ok(token) => {
                    self.call_with_token(&method, &resource, identifiers, params, &token)
                        .await
                }
                Err(err) => Err(err),
            }
        };

        if let Err(err) = &result {
            if err.should_log() {
                warn!(code = err.error_code(), error = %err, %method, %resource, "IPAM call failed");
            } else {
                debug!(code = err.error_code(), error = %err, %method, %resource, "IPAM call failed");
            }
        }
        result
    }

    /// Deletes the server session and marks the connection terminated.
    ///
    /// Failures are logged and swallowed. Calling this twice is a no-op.
    pub async fn terminate(&self) {
        let mut session = self.session.lock().await;
        let previous = std::mem::replace(&mut *session, SessionState::Terminated);

        if let SessionState::Authenticated { token, .. } = previous {
            let result = self
                .call_with_token("delete", Collection::User.name(), &[], &Params::new(), &token)
                .await;
            match result {
                Ok(_) => debug!("IPAM session deleted"),
                Err(err) => warn!(error = %err, "failed to delete IPAM session"),
            }
        }
    }

    async fn check_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        match &*session {
            SessionState::Terminated => return Err(terminated()),
            SessionState::Authenticated { token, expires } => {
                let now = Local::now().naive_local();
                match expires {
                    Some(expires) if now > *expires => {
                        debug!(%expires, "session token expired, logging in again");
                    }
                    _ => return Ok(token.clone()),
                }
            }
            SessionState::Unauthenticated => debug!("no session token, logging in"),
        }

        let state = self.authenticate().await?;
        let token = match &state {
            SessionState::Authenticated { token, .. } => token.clone(),
            _ => String::new(),
        };
        *session = state;
        Ok(token)
    }

    async fn authenticate(&self) -> Result<SessionState> {
        let url = Url::parse(&self.resource_url(Collection::User.name(), &[]))?;
        let credentials = format!(
            "{}:{}",
            self.config.username(),
            self.config.password().expose_secret()
        );
        let request = HttpRequest::new(Method::POST, url)
            .with_header("Authorization", format!("Basic {}", STANDARD.encode(credentials)))
            .with_timeout(self.config.login_timeout());

        info!(user = %self.config.username(), "IPAM login");
        let response = self.dispatch(request).await?;

        let data = response.data().and_then(Value::as_object);
        let token = data
            .and_then(|data| data.get("token"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let expires = data
            .and_then(|data| data.get("expires"))
            .and_then(Value::as_str)
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, EXPIRES_FORMAT).ok());

        let Some(token) = token else {
            return Err(Error::request_with_message(
                response,
                "login response carries no token",
            ));
        };

        debug!(expires = ?expires, "IPAM session token stored");
        Ok(SessionState::Authenticated { token, expires })
    }

    async fn call_with_token(
        &self,
        method: &str,
        resource: &str,
        identifiers: &[&str],
        params: &Params,
        token: &str,
    ) -> Result<Response> {
        let path = self.resource_url(resource, identifiers);
        let url = Url::parse(&path)?;

        info!(method, resource, path = %url.path(), scheme = self.scheme().name(), "IPAM request");

        let mut request = HttpRequest::new(http_method(method)?, url)
            .with_header("token", token)
            .with_timeout(self.config.request_timeout());
        if !params.is_empty() {
            request = request.with_form_body(params.to_form());
        }

        self.dispatch(request).await
    }

    async fn call_encrypted(
        &self,
        method: &str,
        resource: &str,
        identifiers: &[&str],
        params: &Params,
    ) -> Result<Response> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or_else(|| Error::ConfigError("Invalid api key".to_string()))?;

        let mut payload = params.to_json_map();
        for (index, identifier) in identifiers.iter().enumerate() {
            let key = if index == 0 {
                "id".to_string()
            } else {
                format!("id{}", index + 1)
            };
            payload.insert(key, Value::String((*identifier).to_string()));
        }
        payload.insert("controller".to_string(), Value::String(resource.to_string()));

        let encrypted = cipher.encrypt_json(&payload)?;
        let url = Url::parse(&format!(
            "{}?app_id={}&enc_request={}",
            self.config.base_url(),
            urlencoding::encode(self.config.app_id()),
            urlencoding::encode(&encrypted)
        ))?;

        info!(method, resource, scheme = self.scheme().name(), "IPAM request");

        let request = HttpRequest::new(http_method(method)?, url)
            .with_header("CIPHER", "openssl")
            .with_timeout(self.config.request_timeout());

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<Response> {
        let response = self.transport.send(request).await?;
        let status = response.status;
        let parsed = Response::from_http(status, &response.body)?;

        if !status.is_success() || !parsed.is_success() {
            return Err(Error::request(parsed));
        }
        Ok(parsed)
    }

    fn resource_url(&self, resource: &str, identifiers: &[&str]) -> String {
        let base = self.config.api_url();
        if resource.is_empty() {
            return base;
        }
        // A `/` inside a segment is kept so CIDR lookups span two path segments.
        let path = identifiers
            .iter()
            .map(|segment| urlencoding::encode(segment).replace("%2F", "/"))
            .collect::<Vec<_>>()
            .join("/");
        add_trailing_slash(&format!("{base}{resource}/{path}"))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.config.base_url())
            .field("app_id", &self.config.app_id())
            .field("scheme", &self.config.scheme())
            .finish_non_exhaustive()
    }
}

/// Runs `f` inside a session that is always terminated afterwards.
///
/// # Errors
///
/// Returns the initialization error, or whatever `f` returns.
pub async fn with_session<F, Fut, T>(
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    f: F,
) -> Result<T>
where
    F: FnOnce(Arc<Connection>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let connection = Connection::initialize(config, transport).await?;
    let result = f(Arc::clone(&connection)).await;
    connection.terminate().await;
    result
}

fn http_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| Error::InvalidRequest(format!("Invalid HTTP method `{method}`")))
}

fn terminated() -> Error {
    Error::ConfigError("connection has been terminated".to_string())
}
