//! Process-wide current connection.
//!
//! Resource operations take a connection explicitly. Applications that prefer a
//! single ambient connection can install one here and fetch it with [`current`].

use crate::connection::Connection;
use crate::Result;
use ipam_core::Error;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

static CURRENT: RwLock<Option<Arc<Connection>>> = RwLock::new(None);

/// Installs `connection` as current, returning the one it replaces.
pub fn install(connection: Arc<Connection>) -> Option<Arc<Connection>> {
    debug!(connection = ?connection, "installing current IPAM connection");
    CURRENT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(connection)
}

/// The current connection.
///
/// # Errors
///
/// Returns a configuration error if no connection has been installed.
pub fn current() -> Result<Arc<Connection>> {
    CURRENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or_else(|| Error::ConfigError("connection is not established".to_string()))
}

/// Removes the current connection, returning it.
pub fn clear() -> Option<Arc<Connection>> {
    CURRENT.write().unwrap_or_else(PoisonError::into_inner).take()
}
