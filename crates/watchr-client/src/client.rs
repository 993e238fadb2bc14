//! Main watchr network client implementation.

use crate::api::{tls, OcspApi, RdapApi, TlsApi};
use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::TlsConnector;
use watchr_core::{
    Certificate, CertificateStatus, ChainFetcher, FetchedChain, RdapDomain, Result,
    RevocationChecker, StructuredRegistry, WatchrError,
};

/// Network client for chain retrieval, OCSP and RDAP.
///
/// Cheap to clone; clones share the connection pool and TLS configuration.
#[derive(Clone)]
pub struct WatchrClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    tls: TlsConnector,
    config: ClientConfig,
}

impl WatchrClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        WatchrClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> WatchrClientBuilder {
        WatchrClientBuilder::new()
    }

    /// Access the TLS chain fetcher
    #[must_use]
    pub const fn tls(&self) -> TlsApi<'_> {
        TlsApi::new(self)
    }

    /// Access the OCSP responder client
    #[must_use]
    pub const fn ocsp(&self) -> OcspApi<'_> {
        OcspApi::new(self)
    }

    /// Access the RDAP client
    #[must_use]
    pub const fn rdap(&self) -> RdapApi<'_> {
        RdapApi::new(self)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub(crate) fn tls_connector(&self) -> &TlsConnector {
        &self.inner.tls
    }

    /// Classify a reqwest failure into the engine's transport errors
    pub(crate) fn transport_error(&self, error: &reqwest::Error) -> WatchrError {
        if error.is_timeout() {
            WatchrError::Timeout(self.inner.config.timeout_secs)
        } else if error.is_connect() {
            WatchrError::Network(error.to_string())
        } else {
            WatchrError::Http(error.to_string())
        }
    }
}

#[async_trait]
impl ChainFetcher for WatchrClient {
    async fn fetch(&self, domain: &str) -> Result<FetchedChain> {
        self.tls().fetch(domain).await
    }
}

#[async_trait]
impl RevocationChecker for WatchrClient {
    async fn check_revocation(
        &self,
        leaf: &Certificate,
        issuer: &Certificate,
    ) -> Result<CertificateStatus> {
        self.ocsp().check(leaf, issuer).await
    }
}

#[async_trait]
impl StructuredRegistry for WatchrClient {
    async fn lookup(&self, domain: &str) -> Result<Option<RdapDomain>> {
        self.rdap().domain(domain).await
    }
}

/// Builder for configuring a [`WatchrClient`]
#[derive(Debug, Clone, Default)]
pub struct WatchrClientBuilder {
    config: ClientConfig,
}

impl WatchrClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every setting at once
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the TCP connect timeout (whole seconds)
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the total timeout of one network operation (whole seconds)
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs();
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the port used for TLS handshakes
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the RDAP base URL (useful for testing)
    #[must_use]
    pub fn rdap_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.rdap_base_url = url.into();
        self
    }

    /// Build the client
    pub fn build(mut self) -> Result<WatchrClient> {
        self.config.validate()?;
        self.config.rdap_base_url = self.config.rdap_base_url.trim_end_matches('/').to_string();

        let http = HttpClient::builder()
            .connect_timeout(self.config.connect_timeout())
            .timeout(self.config.timeout())
            .user_agent(&self.config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| WatchrError::Http(e.to_string()))?;

        Ok(WatchrClient {
            inner: Arc::new(ClientInner {
                http,
                tls: tls::inspecting_connector()?,
                config: self.config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_settings() {
        let client = WatchrClient::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .port(8443)
            .rdap_base_url("http://127.0.0.1:9000/")
            .user_agent("probe/1.0")
            .build()
            .unwrap();

        let config = client.config();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 2);
        assert_eq!(config.port, 8443);
        assert_eq!(config.rdap_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.user_agent, "probe/1.0");
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = WatchrClient::builder().port(0).build();
        assert!(matches!(result, Err(WatchrError::Config(_))));
    }
}
