use thiserror::Error;

/// Result type alias for watchr operations
pub type Result<T> = std::result::Result<T, WatchrError>;

/// Errors that can occur while fetching, parsing or resolving the entities under check.
///
/// Predicate failures during evaluation are never raised through this type; they are
/// collected as report entries by the orchestrator.
#[derive(Error, Debug)]
pub enum WatchrError {
    /// TCP or TLS transport failed
    #[error("network error: {0}")]
    Network(String),

    /// Network operation exceeded its time budget
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Certificate or PEM blob could not be decoded
    #[error("failed to parse certificate: {reason}")]
    Parse {
        /// Underlying decoder message
        reason: String,
    },

    /// Requested digest algorithm is not available
    #[error("digest algorithm unavailable: {0}")]
    Digest(String),

    /// TLS peer presented no certificates
    #[error("no certificate presented by {host}")]
    EmptyChain {
        /// Host that was contacted
        host: String,
    },

    /// Neither registry source produced registration data
    #[error("failed to resolve domain {domain} (rdap: {structured}; whois: {legacy})")]
    Resolution {
        /// Domain being resolved
        domain: String,
        /// Why the structured registry lookup produced nothing
        structured: String,
        /// Why the legacy registry lookup produced nothing
        legacy: String,
    },

    /// Certificate carries no OCSP responder in its Authority Information Access extension
    #[error("certificate has no OCSP responder URL")]
    NoResponderUrl,

    /// OCSP responder answered with an unexpected status or media type
    #[error("OCSP responder returned status {status} with content type {content_type:?}")]
    Responder {
        /// HTTP status code
        status: u16,
        /// Observed `Content-Type` header
        content_type: String,
    },

    /// OCSP response did not carry a definite revocation state
    #[error("OCSP revocation state is unknown: {reason}")]
    UnknownRevocationState {
        /// What made the state indeterminate
        reason: String,
    },

    /// Chain position requested past the end of the chain
    #[error("chain index {index} out of bounds (chain length {len})")]
    OutOfBounds {
        /// Requested position
        index: usize,
        /// Chain length
        len: usize,
    },

    /// Domain name failed syntax validation
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// WHOIS lookup failed
    #[error("WHOIS lookup failed: {0}")]
    Whois(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WatchrError {
    /// Returns true if a caller may reasonably retry the failed operation.
    ///
    /// The engine itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::Http(_))
    }

    /// Build a [`WatchrError::Parse`] from any displayable decoder error
    pub fn parse(reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            reason: reason.to_string(),
        }
    }
}
