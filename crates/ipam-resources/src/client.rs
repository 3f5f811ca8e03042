//! Client facade over a [`Connection`].

use crate::Result;
use chrono::NaiveDateTime;
use ipam_api::{current, Connection, Transport};
use ipam_core::{Collection, ConnectionConfig, Params, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Entry point bundling connection setup with server-wide calls.
///
/// Resource operations take the connection explicitly:
///
/// ```no_run
/// # async fn run() -> ipam_resources::Result<()> {
/// use ipam_core::{ConnectionConfig, SigningScheme};
/// use ipam_resources::{IpamClient, Resource, Section};
///
/// let config = ConnectionConfig::new("ipam.example.com", "inventory", SigningScheme::TlsToken)?
///     .with_credentials("admin", "secret");
/// let client = IpamClient::connect(config).await?;
/// let sections = Section::get_all(client.connection()).await?;
/// client.terminate().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IpamClient {
    connection: Arc<Connection>,
}

impl IpamClient {
    /// Initializes a connection over the given transport.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings and a request error
    /// when the login is rejected.
    pub async fn initialize(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let connection = Connection::initialize(config, transport).await?;
        Ok(Self { connection })
    }

    /// Initializes a connection over HTTPS with the default HTTP client.
    ///
    /// # Errors
    ///
    /// See [`Self::initialize`].
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let connection = Connection::connect(config).await?;
        Ok(Self { connection })
    }

    /// Wraps an existing connection.
    #[must_use]
    pub const fn from_connection(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    /// Client for the process-wide connection.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no connection was installed.
    pub fn current() -> Result<Self> {
        current::current().map(Self::from_connection)
    }

    /// Installs this client's connection as the process-wide connection.
    pub fn make_current(&self) {
        if current::install(Arc::clone(&self.connection)).is_some() {
            debug!("replaced the process-wide IPAM connection");
        }
    }

    /// The underlying connection, passed to resource operations.
    #[must_use]
    pub const fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Raw call to any controller.
    ///
    /// # Errors
    ///
    /// See [`Connection::call`].
    pub async fn call(
        &self,
        method: &str,
        resource: &str,
        identifiers: &[&str],
        params: &Params,
    ) -> Result<Response> {
        self.connection
            .call(method, resource, identifiers, params)
            .await
    }

    /// Controllers and methods the server exposes.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn all_controllers(&self) -> Result<Option<Value>> {
        let response = self.call("options", "", &[], &Params::new()).await?;
        Ok(response.into_data())
    }

    /// Current session token, if logged in.
    pub async fn token(&self) -> Option<String> {
        self.connection.token().await
    }

    /// Expiry of the current session token.
    pub async fn token_expires(&self) -> Option<NaiveDateTime> {
        self.connection.token_expires().await
    }

    /// Every user account.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn all_users(&self) -> Result<Option<Value>> {
        let response = self
            .call("get", Collection::User.name(), &["all"], &Params::new())
            .await?;
        Ok(response.into_data())
    }

    /// Every administrator account.
    ///
    /// # Errors
    ///
    /// Returns the call error.
    pub async fn all_admins(&self) -> Result<Option<Value>> {
        let response = self
            .call("admins", Collection::User.name(), &["all"], &Params::new())
            .await?;
        Ok(response.into_data())
    }

    /// Ends the session. Errors are logged, never returned.
    pub async fn terminate(&self) {
        self.connection.terminate().await;
    }
}
