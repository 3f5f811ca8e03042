//! # ipam-core
//!
//! Core types and utilities for talking to an IP address management REST service.
//!
//! This crate provides the error taxonomy, connection configuration, the response
//! envelope and request parameter types shared by the connection and resource crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and their diagnostic codes
//! - [`types`] - Resource collections and request signing schemes
//! - [`config`] - Connection configuration, validation and URL normalization
//! - [`client`] - HTTP client tuning shared by transports
//! - [`response`] - The server's response envelope
//! - [`params`] - Request parameters, typed references and form encoding

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use params::{ParamValue, Params, ResourceRef};
pub use response::Response;
pub use types::{Collection, SigningScheme};
