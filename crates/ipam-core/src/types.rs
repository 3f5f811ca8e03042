//! Resource collections and request signing schemes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-side resource collections.
///
/// Collection names are case-insensitive on the wire and always sent lowercased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Sections
    Sections,
    /// Subnets
    Subnets,
    /// IP addresses
    Addresses,
    /// VLANs
    Vlan,
    /// Layer 2 domains
    L2Domains,
    /// VRFs
    Vrf,
    /// Devices
    Devices,
    /// Users and authentication
    User,
}

impl Collection {
    /// All collections.
    pub const ALL: [Self; 8] = [
        Self::Sections,
        Self::Subnets,
        Self::Addresses,
        Self::Vlan,
        Self::L2Domains,
        Self::Vrf,
        Self::Devices,
        Self::User,
    ];

    /// Wire name of the collection.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Subnets => "subnets",
            Self::Addresses => "addresses",
            Self::Vlan => "vlan",
            Self::L2Domains => "l2domains",
            Self::Vrf => "vrf",
            Self::Devices => "devices",
            Self::User => "user",
        }
    }

    /// Key under which records of this collection carry their identifier.
    #[must_use]
    pub const fn id_key(&self) -> &'static str {
        match self {
            Self::Vlan => "vlanId",
            _ => "id",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|collection| collection.name() == lowered)
            .ok_or_else(|| Error::ConfigError(format!("Unknown collection: {s}")))
    }
}

/// How requests are authenticated on the wire.
///
/// Exactly one scheme is active per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningScheme {
    /// Session token obtained by basic-auth login, sent over TLS
    #[default]
    TlsToken,
    /// Whole payload encrypted with a shared application key
    SharedSecret,
    /// Encrypted payload sent over TLS
    Both,
}

impl SigningScheme {
    /// Configuration name of the scheme.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TlsToken => "ssl",
            Self::SharedSecret => "crypt",
            Self::Both => "ssl|crypt",
        }
    }

    /// URL scheme forced onto the base URL.
    #[must_use]
    pub const fn url_scheme(&self) -> &'static str {
        match self {
            Self::TlsToken | Self::Both => "https://",
            Self::SharedSecret => "http://",
        }
    }

    /// Whether requests carry an encrypted payload instead of a session token.
    #[must_use]
    pub const fn encrypts_payload(&self) -> bool {
        matches!(self, Self::SharedSecret | Self::Both)
    }

    /// Whether the scheme maintains a login session.
    #[must_use]
    pub const fn uses_session(&self) -> bool {
        matches!(self, Self::TlsToken)
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SigningScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssl" => Ok(Self::TlsToken),
            "crypt" => Ok(Self::SharedSecret),
            "ssl|crypt" => Ok(Self::Both),
            _ => Err(Error::ConfigError(format!("Invalid security method: {s}"))),
        }
    }
}
