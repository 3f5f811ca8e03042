//! Authenticated connection to the IPAM REST service.
//!
//! A [`Connection`] owns the transport, the authentication state and the signing
//! scheme, and exposes a single [`Connection::call`] used by every resource type.

#![deny(missing_docs)]

pub mod connection;
pub mod crypt;
pub mod current;
#[cfg(feature = "test-util")]
pub mod testing;
pub mod transport;

pub use connection::{with_session, Connection, SessionState};
pub use crypt::SharedSecretCipher;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Convenient result alias sharing the `ipam-core` error type.
pub type Result<T> = ipam_core::Result<T>;
