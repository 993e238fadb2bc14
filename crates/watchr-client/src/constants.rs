//! Network defaults and protocol media types.

use std::time::Duration;

/// `Content-Type` of an OCSP request body (RFC 6960 appendix A)
pub const OCSP_REQUEST_MEDIA_TYPE: &str = "application/ocsp-request";

/// `Content-Type` a responder must answer with
pub const OCSP_RESPONSE_MEDIA_TYPE: &str = "application/ocsp-response";

/// RDAP JSON media type (RFC 7480)
pub const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// Bootstrap redirector that forwards to the authoritative RDAP server
pub const DEFAULT_RDAP_BASE_URL: &str = "https://rdap.org";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_PORT: u16 = 443;

pub const DEFAULT_USER_AGENT: &str = concat!("watchr/", env!("CARGO_PKG_VERSION"));
