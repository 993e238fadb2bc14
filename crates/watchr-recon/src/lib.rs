//! Domain registration resolution for the watchr verification engine.
//!
//! [`DomainResolver`] asks a structured registry (RDAP) first and falls back to
//! a legacy registry (WHOIS), normalizing either answer into one
//! [`DomainInfo`](watchr_core::DomainInfo).

mod error;

#[cfg(feature = "whois")]
pub mod whois;

pub mod resolver;

pub use error::{ReconError, ReconResult};
pub use resolver::DomainResolver;
