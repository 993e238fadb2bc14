//! Certificate and domain verification: TLS chains, OCSP revocation and registration data.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use watchr::{Verifier, WatchrConfig};
//!
//! #[tokio::main]
//! async fn main() -> watchr::Result<()> {
//!     let mut config = WatchrConfig::new("example.com");
//!     config.certificate.enabled = true;
//!     config.certificate.ocsp_revoked = true;
//!     config.domain.enabled = true;
//!     config.domain.status_flags = vec!["clientTransferProhibited".into()];
//!
//!     let verifier = Verifier::from_config(config)?;
//!     for run in verifier.check_all().await {
//!         println!("{}: passed={}", run.subject, run.passed);
//!         for error in &run.errors {
//!             println!("  {error}");
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for the HTTP client (recommended)
//! - `native-tls` - Use system native TLS for the HTTP client

#![doc(html_root_url = "https://docs.rs/watchr/2.0.0")]

pub mod checks;
mod config;
mod verify;

pub use config::*;
pub use verify::{Evaluation, Stage, Verifier};

// Re-export core types
pub use watchr_core::*;

// Re-export client
pub use watchr_client::{constants, ClientConfig, WatchrClient, WatchrClientBuilder};

pub use watchr_recon as recon;
pub use watchr_recon::DomainResolver;

// Re-export runtime for convenience
pub use tokio;
pub use serde;
pub use serde_json;
