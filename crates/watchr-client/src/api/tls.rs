//! Peer certificate chain retrieval.
//!
//! The handshake accepts whatever the server presents: the chain is collected
//! for inspection, never validated against a root store.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use watchr_core::{
    validate_domain, Certificate, CertificateChain, FetchedChain, Result, WatchrError,
};

use crate::WatchrClient;

/// TLS chain retrieval
pub struct TlsApi<'a> {
    client: &'a WatchrClient,
}

impl<'a> TlsApi<'a> {
    pub(crate) const fn new(client: &'a WatchrClient) -> Self {
        Self { client }
    }

    /// Fetch the chain `domain` presents on the configured port
    pub async fn fetch(&self, domain: &str) -> Result<FetchedChain> {
        self.fetch_on(domain, self.client.config().port).await
    }

    /// Fetch the chain `domain` presents on `port`.
    ///
    /// The TCP connect is bounded by the connect timeout and the whole exchange
    /// by the total timeout.
    pub async fn fetch_on(&self, domain: &str, port: u16) -> Result<FetchedChain> {
        validate_domain(domain)?;
        let host = domain.strip_suffix('.').unwrap_or(domain);

        let config = self.client.config();
        timeout(config.timeout(), self.handshake(host, port))
            .await
            .map_err(|_| WatchrError::Timeout(config.timeout_secs))?
    }

    async fn handshake(&self, host: &str, port: u16) -> Result<FetchedChain> {
        let config = self.client.config();
        debug!(host = %host, port, "TLS connect");

        let tcp = timeout(config.connect_timeout(), TcpStream::connect((host, port)))
            .await
            .map_err(|_| WatchrError::Timeout(config.connect_timeout_secs))?
            .map_err(|e| WatchrError::Network(format!("failed to connect to {host}:{port}: {e}")))?;

        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|e| WatchrError::InvalidDomain(format!("{host:?}: {e}")))?;

        let mut stream = self
            .client
            .tls_connector()
            .connect(server_name, tcp)
            .await
            .map_err(|e| WatchrError::Network(format!("TLS handshake with {host} failed: {e}")))?;

        let (_, session) = stream.get_ref();
        let protocol = session.protocol_version().map(|v| format!("{v:?}"));
        let cipher_suite = session
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()));
        let presented: Vec<CertificateDer<'static>> = session
            .peer_certificates()
            .map(<[CertificateDer<'static>]>::to_vec)
            .unwrap_or_default();

        // The probe request is a courtesy; the chain is already in hand.
        let probe = format!(
            "HEAD / HTTP/1.1\r\nHost: {host}\r\nUser-Agent: {}\r\nConnection: close\r\n\r\n",
            config.user_agent
        );
        if let Err(e) = stream.write_all(probe.as_bytes()).await {
            debug!(host = %host, error = %e, "HEAD probe failed");
        }
        if let Err(e) = stream.shutdown().await {
            debug!(host = %host, error = %e, "TLS shutdown failed");
        }

        if presented.is_empty() {
            return Err(WatchrError::EmptyChain {
                host: host.to_string(),
            });
        }

        let chain = presented
            .iter()
            .map(|der| Certificate::from_der(der.as_ref()))
            .collect::<Result<CertificateChain>>()?;

        debug!(
            host = %host,
            certificates = chain.len(),
            protocol = protocol.as_deref().unwrap_or("unknown"),
            "fetched peer chain"
        );

        Ok(FetchedChain {
            host: host.to_string(),
            port,
            protocol,
            cipher_suite,
            chain,
        })
    }
}

/// Connector whose verifier accepts any server certificate
pub(crate) fn inspecting_connector() -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| WatchrError::Config(format!("TLS configuration: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

#[derive(Debug)]
struct NoCertificateVerification;

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _: &CertificateDer<'_>,
        _: &[CertificateDer<'_>],
        _: &ServerName<'_>,
        _: &[u8],
        _: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _: &[u8],
        _: &CertificateDer<'_>,
        _: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _: &[u8],
        _: &CertificateDer<'_>,
        _: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}
