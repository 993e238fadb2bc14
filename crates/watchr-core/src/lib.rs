//! Core types and traits for the watchr verification engine.
//!
//! This crate provides the foundational pieces shared by the other watchr crates:
//!
//! - **Types**: [`Certificate`], [`CertificateChain`], [`CertificateStatus`], [`DomainInfo`]
//!   and the raw registry records they are normalized from
//! - **Codec**: OCSP request building and response decoding
//! - **Traits**: the collaborator seams used by the orchestrator
//! - **Errors**: the [`WatchrError`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use watchr_core::{Certificate, Result};
//!
//! fn describe(pem: &str) -> Result<()> {
//!     let cert = Certificate::from_pem(pem)?;
//!     println!("CN: {:?}", cert.subject_common_name);
//!     println!("Expires: {}", cert.valid_to);
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/watchr-core/2.0.0")]

pub mod codec;
mod error;
pub mod traits;
pub mod types;

pub use error::{Result, WatchrError};
pub use traits::*;
pub use types::*;
