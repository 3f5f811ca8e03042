//! HTTP client tuning shared by transports.
//!
//! Ordinary calls are never retried; the only automatic repeat is the re-login a
//! connection performs when its session token has expired.

use std::time::Duration;

/// Timeout for ordinary API calls (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Timeout for the login exchange (seconds)
pub const LOGIN_TIMEOUT: u64 = 60;

/// Connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Idle pooled connections are dropped after this many seconds
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Idle connections kept per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Tuning of the underlying HTTP client.
///
/// The request timeout set here is replaced by the connection's configured
/// request timeout; see `ConnectionConfig::http_config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// TCP and TLS connect timeout
    pub connect_timeout: Duration,
    /// Idle pooled connection lifetime
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// Accept gzip-compressed responses
    pub enable_compression: bool,
    /// User agent override; the transport's own agent is used when unset
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Tuning with the default timeouts and pool sizes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
            user_agent: None,
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Pool sizing.
    #[must_use]
    pub const fn with_pool(mut self, idle_timeout: Duration, max_idle_per_host: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle_per_host;
        self
    }

    /// Turns gzip support on or off.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Sends a custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
