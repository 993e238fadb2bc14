//! Client configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use watchr_core::{Result, WatchrError};

use crate::constants;

/// Transport settings shared by the TLS, OCSP and RDAP endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// TCP connect timeout in seconds
    #[serde(rename = "connectTimeout", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Total time budget of one network operation in seconds
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent sent on HTTP requests and in the TLS probe
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Port the TLS handshake is made on
    #[serde(default = "default_port")]
    pub port: u16,

    /// RDAP server queried as `{base}/domain/{name}`
    #[serde(default = "default_rdap_base_url")]
    pub rdap_base_url: String,
}

fn default_connect_timeout() -> u64 {
    constants::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_timeout() -> u64 {
    constants::DEFAULT_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    constants::DEFAULT_USER_AGENT.to_string()
}

const fn default_port() -> u16 {
    constants::DEFAULT_PORT
}

fn default_rdap_base_url() -> String {
    constants::DEFAULT_RDAP_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            port: default_port(),
            rdap_base_url: default_rdap_base_url(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reject zero timeouts, a zero port and an unusable RDAP base URL
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 || self.timeout_secs == 0 {
            return Err(WatchrError::Config("timeouts must be at least one second".into()));
        }
        if self.port == 0 {
            return Err(WatchrError::Config("port must be non-zero".into()));
        }

        let base = url::Url::parse(&self.rdap_base_url).map_err(|e| {
            WatchrError::Config(format!("invalid rdapBaseUrl {:?}: {e}", self.rdap_base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(WatchrError::Config(format!(
                "rdapBaseUrl must be http or https, got {}",
                base.scheme()
            )));
        }

        Ok(())
    }
}
