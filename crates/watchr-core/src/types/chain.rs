use serde::{Deserialize, Serialize};

use super::Certificate;
use crate::error::{Result, WatchrError};

/// Certificates as presented by a TLS peer, leaf first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    #[must_use]
    pub const fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Certificate at `index`, where 0 is the leaf
    pub fn at(&self, index: usize) -> Result<&Certificate> {
        self.certificates
            .get(index)
            .ok_or(WatchrError::OutOfBounds {
                index,
                len: self.certificates.len(),
            })
    }

    pub fn leaf(&self) -> Result<&Certificate> {
        self.at(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Same chain with every PEM blob dropped
    #[must_use]
    pub fn without_pem(self) -> Self {
        self.certificates
            .into_iter()
            .map(Certificate::without_pem)
            .collect()
    }
}

impl FromIterator<Certificate> for CertificateChain {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A chain together with the handshake it was collected from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedChain {
    pub host: String,
    pub port: u16,
    /// Negotiated protocol version, e.g. `TLSv1_3`
    pub protocol: Option<String>,
    pub cipher_suite: Option<String>,
    pub chain: CertificateChain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyUsage;
    use chrono::{TimeZone, Utc};

    fn cert(cn: &str) -> Certificate {
        Certificate {
            pem: Some(format!("pem of {cn}")),
            subject_common_name: Some(cn.to_string()),
            subject_organization: None,
            subject_country: None,
            issuer_common_name: Some("Issuer".to_string()),
            issuer_organization: Some("Issuer Org".to_string()),
            issuer_country: None,
            self_signed: false,
            signature_type_short_name: "RSA-SHA256".to_string(),
            signature_type_long_name: "sha256WithRSAEncryption".to_string(),
            signature_type_oid: "1.2.840.113549.1.1.11".to_string(),
            public_key_algorithm: "rsaEncryption".to_string(),
            valid_from: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            valid_to: Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
            sha1_fingerprint: "a".repeat(40),
            sha256_fingerprint: "b".repeat(64),
            serial_number: "01".to_string(),
            subject_alternative_names: vec![cn.to_string()],
            certificate_authority: false,
            key_usage: KeyUsage::default(),
            ocsp_responder_url: None,
        }
    }

    #[test]
    fn indexing_past_the_end_is_an_error() {
        let chain: CertificateChain = [cert("leaf"), cert("intermediate")].into_iter().collect();
        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain.leaf().unwrap().subject_common_name.as_deref(),
            Some("leaf")
        );
        assert!(matches!(
            chain.at(2),
            Err(WatchrError::OutOfBounds { index: 2, len: 2 })
        ));
    }

    #[test]
    fn empty_chain_has_no_leaf() {
        let chain = CertificateChain::default();
        assert!(chain.is_empty());
        assert!(chain.leaf().is_err());
    }

    #[test]
    fn serializes_as_plain_list() {
        let chain = CertificateChain::new(vec![cert("leaf")]);
        let json = serde_json::to_value(&chain).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["subjectCommonName"], "leaf");
        assert_eq!(json[0]["validTo"], "2025-04-01T00:00:00Z");

        let back: CertificateChain = serde_json::from_value(json).unwrap();
        assert_eq!(back, chain);
    }

    #[test]
    fn dropping_pem_keeps_normalized_fields() {
        let chain = CertificateChain::new(vec![cert("leaf")]);
        let compact = chain.clone().without_pem();
        let json = serde_json::to_string(&compact).unwrap();
        assert!(!json.contains("\"pem\""));

        let back: CertificateChain = serde_json::from_str(&json).unwrap();
        assert_eq!(back.leaf().unwrap().pem, None);
        assert_eq!(
            back.leaf().unwrap().sha256_fingerprint,
            chain.leaf().unwrap().sha256_fingerprint
        );
    }
}
