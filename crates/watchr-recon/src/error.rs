use thiserror::Error;

/// Result type alias for registry lookups
pub type ReconResult<T> = std::result::Result<T, ReconError>;

/// Errors from the legacy registry client
#[derive(Error, Debug)]
pub enum ReconError {
    /// WHOIS lookup error
    #[error("WHOIS error: {0}")]
    Whois(String),

    /// Blocking lookup task did not complete
    #[error("lookup task failed: {0}")]
    Task(String),

    /// Timeout, in seconds
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// Domain name failed syntax validation
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

impl From<ReconError> for watchr_core::WatchrError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::Whois(msg) => Self::Whois(msg),
            ReconError::Task(msg) => Self::Network(msg),
            ReconError::Timeout(secs) => Self::Timeout(secs),
            ReconError::InvalidDomain(msg) => Self::InvalidDomain(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchr_core::WatchrError;

    #[test]
    fn converts_into_engine_errors() {
        let err: WatchrError = ReconError::Whois("no server".into()).into();
        assert!(matches!(err, WatchrError::Whois(msg) if msg == "no server"));

        let err: WatchrError = ReconError::Timeout(30).into();
        assert!(matches!(err, WatchrError::Timeout(30)));
        assert!(err.is_retryable());

        let err: WatchrError = ReconError::InvalidDomain("x y".into()).into();
        assert!(!err.is_retryable());
    }
}
