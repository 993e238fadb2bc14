//! Network transport for the watchr verification engine.
//!
//! [`WatchrClient`] owns one HTTP client and one TLS connector and exposes three
//! endpoint groups:
//!
//! - [`TlsApi`](api::TlsApi): handshake with a host and collect the presented chain
//! - [`OcspApi`](api::OcspApi): ask the issuing CA's responder for revocation status
//! - [`RdapApi`](api::RdapApi): look up domain registration data over RDAP
//!
//! The client also implements the [`ChainFetcher`](watchr_core::ChainFetcher),
//! [`RevocationChecker`](watchr_core::RevocationChecker) and
//! [`StructuredRegistry`](watchr_core::StructuredRegistry) seams.

mod client;
mod config;
pub mod api;
pub mod constants;

pub use client::{WatchrClient, WatchrClientBuilder};
pub use config::*;
pub use watchr_core::{Result, WatchrError};
