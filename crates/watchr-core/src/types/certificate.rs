use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use ring::digest;
use serde::{Deserialize, Serialize};
use x509_parser::objects::{oid2description, oid2sn, oid_registry};
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::{AttributeTypeAndValue, GeneralName, X509Certificate};

use crate::codec::ocsp::responder_url;
use crate::error::{Result, WatchrError};

/// PEM label for X.509 certificates
pub const PEM_TAG: &str = "CERTIFICATE";

/// Key-usage and extended-key-usage names recognised on a certificate
pub const KEY_USAGE_VOCABULARY: [&str; 15] = [
    "Digital Signature",
    "Non-Repudiation",
    "Key Encipherment",
    "Data Encipherment",
    "Key Agreement",
    "Certificate Sign",
    "CRL Sign",
    "Encipher Only",
    "Decipher Only",
    "TLS Web Server Authentication",
    "TLS Web Client Authentication",
    "Code Signing",
    "E-mail Protection",
    "Timestamping",
    "OCSP Signing",
];

/// Hash used for certificate fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Lower-case hex digest of `data`
    #[must_use]
    pub fn hex_digest(self, data: &[u8]) -> String {
        let algorithm = match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
        };
        hex::encode(digest::digest(algorithm, data).as_ref())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = WatchrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(WatchrError::Digest(other.to_string())),
        }
    }
}

/// Key usage flags, all false when the extensions are absent
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    #[serde(rename = "cRLSign")]
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
    pub server_auth: bool,
    pub client_auth: bool,
    pub code_signing: bool,
    pub email_protection: bool,
    pub time_stamping: bool,
    #[serde(rename = "OCSPSigning")]
    pub ocsp_signing: bool,
}

impl KeyUsage {
    /// Set the flags whose names appear in `names`. Unknown names are ignored.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut usage = Self::default();
        for name in names {
            match name {
                "Digital Signature" => usage.digital_signature = true,
                "Non-Repudiation" => usage.non_repudiation = true,
                "Key Encipherment" => usage.key_encipherment = true,
                "Data Encipherment" => usage.data_encipherment = true,
                "Key Agreement" => usage.key_agreement = true,
                "Certificate Sign" => usage.key_cert_sign = true,
                "CRL Sign" => usage.crl_sign = true,
                "Encipher Only" => usage.encipher_only = true,
                "Decipher Only" => usage.decipher_only = true,
                "TLS Web Server Authentication" => usage.server_auth = true,
                "TLS Web Client Authentication" => usage.client_auth = true,
                "Code Signing" => usage.code_signing = true,
                "E-mail Protection" => usage.email_protection = true,
                "Timestamping" => usage.time_stamping = true,
                "OCSP Signing" => usage.ocsp_signing = true,
                _ => {}
            }
        }
        usage
    }

    /// Names of the flags that are set, in vocabulary order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let flags = [
            self.digital_signature,
            self.non_repudiation,
            self.key_encipherment,
            self.data_encipherment,
            self.key_agreement,
            self.key_cert_sign,
            self.crl_sign,
            self.encipher_only,
            self.decipher_only,
            self.server_auth,
            self.client_auth,
            self.code_signing,
            self.email_protection,
            self.time_stamping,
            self.ocsp_signing,
        ];
        KEY_USAGE_VOCABULARY
            .iter()
            .zip(flags)
            .filter_map(|(name, set)| set.then_some(*name))
            .collect()
    }
}

/// One parsed X.509 certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// PEM text the certificate was parsed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pem: Option<String>,
    pub subject_common_name: Option<String>,
    pub subject_organization: Option<String>,
    pub subject_country: Option<String>,
    pub issuer_common_name: Option<String>,
    pub issuer_organization: Option<String>,
    pub issuer_country: Option<String>,
    pub self_signed: bool,
    pub signature_type_short_name: String,
    pub signature_type_long_name: String,
    pub signature_type_oid: String,
    pub public_key_algorithm: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub sha1_fingerprint: String,
    pub sha256_fingerprint: String,
    /// Upper-case hex, no separators
    pub serial_number: String,
    #[serde(default)]
    pub subject_alternative_names: Vec<String>,
    pub certificate_authority: bool,
    #[serde(flatten)]
    pub key_usage: KeyUsage,
    #[serde(default)]
    pub ocsp_responder_url: Option<String>,
}

impl Certificate {
    /// Parse a PEM-encoded certificate
    pub fn from_pem(pem_text: &str) -> Result<Self> {
        let block = pem::parse(pem_text).map_err(WatchrError::parse)?;
        if block.tag() != PEM_TAG {
            return Err(WatchrError::parse(format!(
                "expected {PEM_TAG} block, found {}",
                block.tag()
            )));
        }
        Self::parse_der(block.contents(), pem::encode(&block))
    }

    /// Parse a DER-encoded certificate, keeping a PEM rendition of it
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let pem_text = pem::encode(&pem::Pem::new(PEM_TAG, der.to_vec()));
        Self::parse_der(der, pem_text)
    }

    fn parse_der(der: &[u8], pem_text: String) -> Result<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(der).map_err(WatchrError::parse)?;

        let valid_from = asn1_to_utc(cert.validity().not_before.timestamp())?;
        let valid_to = asn1_to_utc(cert.validity().not_after.timestamp())?;
        if valid_from >= valid_to {
            return Err(WatchrError::parse("validity window is empty"));
        }

        let signature_oid = &cert.signature_algorithm.algorithm;
        let subject = cert.subject();
        let issuer = cert.issuer();

        Ok(Self {
            pem: Some(pem_text),
            subject_common_name: first_value(subject.iter_common_name()),
            subject_organization: first_value(subject.iter_organization()),
            subject_country: first_value(subject.iter_country()),
            issuer_common_name: first_value(issuer.iter_common_name()),
            issuer_organization: first_value(issuer.iter_organization()),
            issuer_country: first_value(issuer.iter_country()),
            self_signed: subject.as_raw() == issuer.as_raw(),
            signature_type_short_name: short_name(signature_oid),
            signature_type_long_name: oid2description(signature_oid, oid_registry())
                .map_or_else(|_| signature_oid.to_id_string(), str::to_owned),
            signature_type_oid: signature_oid.to_id_string(),
            public_key_algorithm: short_name(&cert.public_key().algorithm.algorithm),
            valid_from,
            valid_to,
            sha1_fingerprint: DigestAlgorithm::Sha1.hex_digest(der),
            sha256_fingerprint: DigestAlgorithm::Sha256.hex_digest(der),
            serial_number: serial_hex(cert.raw_serial()),
            subject_alternative_names: dns_names(&cert)?,
            certificate_authority: cert
                .basic_constraints()
                .map_err(WatchrError::parse)?
                .is_some_and(|bc| bc.value.ca),
            key_usage: KeyUsage::from_names(usage_names(&cert)?),
            ocsp_responder_url: responder_url(&cert),
        })
    }

    /// DER bytes recovered from the retained PEM
    pub fn der(&self) -> Result<Vec<u8>> {
        let text = self
            .pem
            .as_deref()
            .ok_or_else(|| WatchrError::parse("certificate PEM was not retained"))?;
        pem::parse(text)
            .map(pem::Pem::into_contents)
            .map_err(WatchrError::parse)
    }

    /// Fingerprint over the DER encoding using a named algorithm (`sha1`, `sha-256`, ...)
    pub fn fingerprint(&self, algorithm: &str) -> Result<String> {
        let algorithm: DigestAlgorithm = algorithm.parse()?;
        Ok(algorithm.hex_digest(&self.der()?))
    }

    /// Drop the PEM text for compact output
    #[must_use]
    pub fn without_pem(mut self) -> Self {
        self.pem = None;
        self
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_to < now
    }

    /// Whole days from `now` until `valid_to`, negative once expired
    #[must_use]
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.valid_to - now).num_days()
    }

    /// Common name followed by every SAN entry
    #[must_use]
    pub fn subject_names(&self) -> Vec<&str> {
        self.subject_common_name
            .as_deref()
            .into_iter()
            .chain(self.subject_alternative_names.iter().map(String::as_str))
            .collect()
    }
}

fn asn1_to_utc(epoch: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .ok_or_else(|| WatchrError::parse(format!("timestamp {epoch} out of range")))
}

fn first_value<'a, 'b: 'a>(
    mut attrs: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>,
) -> Option<String> {
    attrs
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

fn short_name(oid: &Oid<'_>) -> String {
    oid2sn(oid, oid_registry()).map_or_else(|_| oid.to_id_string(), str::to_owned)
}

/// Upper-case hex of a DER INTEGER body with leading zero octets removed
#[must_use]
pub fn serial_hex(raw: &[u8]) -> String {
    let skip = raw
        .iter()
        .take_while(|b| **b == 0)
        .count()
        .min(raw.len().saturating_sub(1));
    hex::encode_upper(&raw[skip..])
}

fn dns_names(cert: &X509Certificate<'_>) -> Result<Vec<String>> {
    let Some(san) = cert
        .subject_alternative_name()
        .map_err(WatchrError::parse)?
    else {
        return Ok(Vec::new());
    };

    Ok(san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some((*dns).to_string()),
            _ => None,
        })
        .collect())
}

fn usage_names(cert: &X509Certificate<'_>) -> Result<Vec<&'static str>> {
    let mut names = Vec::new();

    if let Some(ku) = cert.key_usage().map_err(WatchrError::parse)? {
        let ku = ku.value;
        let decoded = [
            ku.digital_signature(),
            ku.non_repudiation(),
            ku.key_encipherment(),
            ku.data_encipherment(),
            ku.key_agreement(),
            ku.key_cert_sign(),
            ku.crl_sign(),
            ku.encipher_only(),
            ku.decipher_only(),
        ];
        names.extend(
            KEY_USAGE_VOCABULARY[..9]
                .iter()
                .zip(decoded)
                .filter_map(|(name, set)| set.then_some(*name)),
        );
    }

    if let Some(eku) = cert.extended_key_usage().map_err(WatchrError::parse)? {
        let eku = eku.value;
        let decoded = [
            eku.server_auth,
            eku.client_auth,
            eku.code_signing,
            eku.email_protection,
            eku.time_stamping,
            eku.ocsp_signing,
        ];
        names.extend(
            KEY_USAGE_VOCABULARY[9..]
                .iter()
                .zip(decoded)
                .filter_map(|(name, set)| set.then_some(*name)),
        );
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{
        BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
        IsCa, KeyPair, KeyUsagePurpose,
    };

    fn root_params() -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Watchr Test Root");
        dn.push(DnType::OrganizationName, "Watchr");
        dn.push(DnType::CountryName, "NL");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.not_before = rcgen::date_time_ymd(2024, 1, 1);
        params.not_after = rcgen::date_time_ymd(2034, 1, 1);
        params
    }

    fn leaf_pem() -> (String, String) {
        let root_key = KeyPair::generate().unwrap();
        let root = root_params().self_signed(&root_key).unwrap();

        let mut params =
            CertificateParams::new(vec!["example.com".to_string(), "*.example.com".to_string()])
                .unwrap();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "example.com");
        params.distinguished_name = dn;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        params.serial_number = Some(vec![0x00, 0x0a, 0xbc].into());
        params.not_before = rcgen::date_time_ymd(2025, 1, 1);
        params.not_after = rcgen::date_time_ymd(2025, 4, 1);

        let leaf_key = KeyPair::generate().unwrap();
        let leaf = params.signed_by(&leaf_key, &root, &root_key).unwrap();
        (leaf.pem(), root.pem())
    }

    #[test]
    fn parses_leaf_fields() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap();

        assert_eq!(cert.subject_common_name.as_deref(), Some("example.com"));
        assert_eq!(cert.issuer_common_name.as_deref(), Some("Watchr Test Root"));
        assert_eq!(cert.issuer_organization.as_deref(), Some("Watchr"));
        assert_eq!(cert.issuer_country.as_deref(), Some("NL"));
        assert!(!cert.self_signed);
        assert!(!cert.certificate_authority);
        assert_eq!(
            cert.subject_alternative_names,
            vec!["example.com", "*.example.com"]
        );
        assert_eq!(cert.serial_number, "0ABC");
        assert_eq!(cert.valid_to.to_rfc3339(), "2025-04-01T00:00:00+00:00");
        assert_eq!(cert.sha1_fingerprint.len(), 40);
        assert_eq!(cert.sha256_fingerprint.len(), 64);
        assert_eq!(cert.signature_type_short_name, "ecdsa-with-SHA256");
        assert!(cert.ocsp_responder_url.is_none());
    }

    #[test]
    fn key_usage_flags_follow_extensions() {
        let (leaf, root) = leaf_pem();
        let leaf = Certificate::from_pem(&leaf).unwrap();
        assert!(leaf.key_usage.digital_signature);
        assert!(leaf.key_usage.key_encipherment);
        assert!(leaf.key_usage.server_auth);
        assert!(leaf.key_usage.client_auth);
        assert!(!leaf.key_usage.key_cert_sign);
        assert!(!leaf.key_usage.ocsp_signing);

        let root = Certificate::from_pem(&root).unwrap();
        assert!(root.self_signed);
        assert!(root.certificate_authority);
        assert!(root.key_usage.key_cert_sign);
        assert!(root.key_usage.crl_sign);
        assert!(!root.key_usage.server_auth);
    }

    #[test]
    fn missing_extensions_mean_no_usage() {
        let key = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec!["plain.test".to_string()]).unwrap();
        let cert = params.self_signed(&key).unwrap();
        let parsed = Certificate::from_pem(&cert.pem()).unwrap();
        assert_eq!(parsed.key_usage, KeyUsage::default());
    }

    #[test]
    fn fingerprint_matches_parsed_value() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap();
        assert_eq!(cert.fingerprint("sha-1").unwrap(), cert.sha1_fingerprint);
        assert_eq!(cert.fingerprint("SHA256").unwrap(), cert.sha256_fingerprint);
    }

    #[test]
    fn unknown_digest_is_an_error() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap();
        assert!(matches!(
            cert.fingerprint("md5"),
            Err(WatchrError::Digest(name)) if name == "md5"
        ));
    }

    #[test]
    fn fingerprint_needs_pem() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap().without_pem();
        assert!(matches!(cert.fingerprint("sha1"), Err(WatchrError::Parse { .. })));
    }

    #[test]
    fn der_and_pem_parsing_agree() {
        let (leaf, _) = leaf_pem();
        let from_pem = Certificate::from_pem(&leaf).unwrap();
        let from_der = Certificate::from_der(&from_pem.der().unwrap()).unwrap();
        assert_eq!(from_pem, from_der);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            Certificate::from_pem("not a certificate"),
            Err(WatchrError::Parse { .. })
        ));

        let wrong_block = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
        assert!(matches!(
            Certificate::from_pem(&wrong_block),
            Err(WatchrError::Parse { .. })
        ));
    }

    #[test]
    fn expiry_is_strict() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap();
        assert!(!cert.is_expired(cert.valid_to));
        assert!(cert.is_expired(cert.valid_to + chrono::Duration::seconds(1)));
        assert_eq!(
            cert.days_until_expiry(cert.valid_to - chrono::Duration::days(3)),
            3
        );
    }

    #[test]
    fn usage_names_round_trip_through_vocabulary() {
        let usage = KeyUsage::from_names(["CRL Sign", "OCSP Signing", "Bogus"]);
        assert!(usage.crl_sign);
        assert!(usage.ocsp_signing);
        assert_eq!(usage.names(), vec!["CRL Sign", "OCSP Signing"]);
    }

    #[test]
    fn json_uses_camel_case_flags() {
        let (leaf, _) = leaf_pem();
        let cert = Certificate::from_pem(&leaf).unwrap();
        let json = serde_json::to_value(&cert).unwrap();
        assert_eq!(json["subjectCommonName"], "example.com");
        assert_eq!(json["serverAuth"], true);
        assert_eq!(json["cRLSign"], false);
        assert_eq!(json["validTo"], "2025-04-01T00:00:00Z");
    }
}
