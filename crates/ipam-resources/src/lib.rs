//! Typed resources of the IPAM REST service.
//!
//! Every collection the server exposes maps to one record type implementing
//! [`Resource`]. Records are plain structs with public optional fields; reference
//! fields hold a [`Ref`] that is either a bare id or the resolved record.

#![deny(missing_docs)]

pub mod address;
pub mod client;
pub mod device;
pub mod l2domain;
pub mod lenient;
pub mod reference;
pub mod resource;
pub mod section;
pub mod subnet;
pub mod vlan;
pub mod vrf;

pub use address::Address;
pub use client::IpamClient;
pub use device::Device;
pub use l2domain::L2Domain;
pub use reference::{Ref, ReferenceField};
pub use resource::Resource;
pub use section::Section;
pub use subnet::Subnet;
pub use vlan::Vlan;
pub use vrf::Vrf;

/// Convenient result alias sharing the `ipam-core` error type.
pub type Result<T> = ipam_core::Result<T>;
