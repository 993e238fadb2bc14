//! Endpoint modules.

mod ocsp;
mod rdap;
pub(crate) mod tls;

pub use ocsp::OcspApi;
pub use rdap::RdapApi;
pub use tls::TlsApi;
