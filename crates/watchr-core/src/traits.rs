//! Seams between the orchestrator and the network collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    Certificate, CertificateStatus, DomainInfo, FetchedChain, RdapDomain, WhoisRecord,
};

/// Retrieves the certificate chain a host presents, without validating trust
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<FetchedChain>;
}

/// Asks the issuing CA whether a certificate has been revoked
#[async_trait]
pub trait RevocationChecker: Send + Sync {
    async fn check_revocation(
        &self,
        leaf: &Certificate,
        issuer: &Certificate,
    ) -> Result<CertificateStatus>;
}

/// Structured registry (RDAP). `Ok(None)` means the registry has no record.
#[async_trait]
pub trait StructuredRegistry: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Option<RdapDomain>>;
}

/// Legacy text registry (WHOIS). `Ok(None)` means nothing could be extracted.
#[async_trait]
pub trait LegacyRegistry: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Option<WhoisRecord>>;
}

/// Produces normalized registration metadata for a domain
#[async_trait]
pub trait DomainLookup: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<DomainInfo>;
}
