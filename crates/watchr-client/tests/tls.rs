use std::sync::Arc;

use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use watchr_client::{WatchrClient, WatchrError};
use watchr_core::ChainFetcher;

/// Self-signed root plus a leaf for `localhost`, leaf first
fn server_identity() -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let root_key = KeyPair::generate().unwrap();
    let mut root_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "Watchr Local Root");
    root_params.distinguished_name = dn;
    root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let root = root_params.self_signed(&root_key).unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let mut leaf_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "localhost");
    leaf_params.distinguished_name = dn;
    let leaf = leaf_params.signed_by(&leaf_key, &root, &root_key).unwrap();

    (
        vec![leaf.der().clone(), root.der().clone()],
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der())),
    )
}

/// Serve one TLS connection on an ephemeral port and return the port
async fn serve_once(chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> u16 {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        if let Ok(mut tls) = acceptor.accept(tcp).await {
            let mut request = Vec::new();
            let _ = tls.read_to_end(&mut request).await;
        }
    });

    port
}

#[tokio::test]
async fn fetches_presented_chain_without_trusting_it() {
    let (chain, key) = server_identity();
    let port = serve_once(chain, key).await;

    let client = WatchrClient::builder().port(port).build().unwrap();
    let fetched = client.fetch("127.0.0.1").await.unwrap();

    assert_eq!(fetched.host, "127.0.0.1");
    assert_eq!(fetched.port, port);
    assert_eq!(fetched.chain.len(), 2);
    assert!(fetched.protocol.is_some());
    assert!(fetched.cipher_suite.is_some());

    let leaf = fetched.chain.leaf().unwrap();
    assert_eq!(leaf.subject_common_name.as_deref(), Some("localhost"));
    assert_eq!(leaf.issuer_common_name.as_deref(), Some("Watchr Local Root"));
    assert!(leaf.pem.is_some());

    let root = fetched.chain.at(1).unwrap();
    assert!(root.self_signed);
    assert!(root.certificate_authority);
}

#[tokio::test]
async fn plain_tcp_peer_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // Accept and hang up without speaking TLS.
        let (tcp, _) = listener.accept().await.unwrap();
        drop(tcp);
    });

    let client = WatchrClient::new().unwrap();
    let result = client.tls().fetch_on("127.0.0.1", port).await;
    assert!(matches!(result, Err(WatchrError::Network(_))));
}
