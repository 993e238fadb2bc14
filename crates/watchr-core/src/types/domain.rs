use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchrError};

/// Delegation signer record; every field is `None` when only presence is known
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSec {
    pub key_tag: Option<u16>,
    pub algorithm: Option<u8>,
    pub digest_type: Option<u8>,
    pub digest: Option<String>,
}

/// Registration metadata, independent of the registry it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainInfo {
    pub domain_name: String,
    pub whois_server: String,
    /// Lower-cased
    #[serde(default)]
    pub name_servers: Vec<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    /// EPP status codes with spaces stripped
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub registrar: String,
    pub dnssec: Option<DnsSec>,
}

impl DomainInfo {
    /// Whole days until expiration, `None` if the registry did not report one
    #[must_use]
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiration_date.map(|at| (at - now).num_days())
    }

    /// Required status flags absent from `states`, compared case-insensitively
    #[must_use]
    pub fn missing_states<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|flag| {
                !self
                    .states
                    .iter()
                    .any(|state| state.eq_ignore_ascii_case(flag))
            })
            .map(String::as_str)
            .collect()
    }
}

/// Reject names that cannot be a DNS domain (length, label syntax)
pub fn validate_domain(domain: &str) -> Result<()> {
    let invalid = |why: &str| Err(WatchrError::InvalidDomain(format!("{domain:?}: {why}")));

    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() {
        return invalid("empty name");
    }
    if name.len() > 253 {
        return invalid("longer than 253 characters");
    }

    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return invalid("label must be 1 to 63 characters");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return invalid("label must not start or end with a hyphen");
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return invalid("label contains invalid characters");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info() -> DomainInfo {
        DomainInfo {
            domain_name: "example.com".into(),
            whois_server: "whois.example.net".into(),
            name_servers: vec!["a.iana-servers.net".into()],
            creation_date: Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap()),
            expiration_date: Some(Utc.with_ymd_and_hms(2026, 8, 13, 4, 0, 0).unwrap()),
            updated_date: None,
            states: vec!["clientDeleteProhibited".into(), "clientTransferProhibited".into()],
            owner: String::new(),
            registrar: "RESERVED-Internet Assigned Numbers Authority".into(),
            dnssec: Some(DnsSec::default()),
        }
    }

    #[test]
    fn missing_states_is_case_insensitive_difference() {
        let required = vec![
            "CLIENTTRANSFERPROHIBITED".to_string(),
            "serverHold".to_string(),
        ];
        assert_eq!(info().missing_states(&required), vec!["serverHold"]);
    }

    #[test]
    fn days_until_expiry_needs_a_date() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 4, 0, 0).unwrap();
        assert_eq!(info().days_until_expiry(now), Some(10));

        let mut undated = info();
        undated.expiration_date = None;
        assert_eq!(undated.days_until_expiry(now), None);
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let original = info();
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"expirationDate\":\"2026-08-13T04:00:00Z\""));
        let back: DomainInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("www.example.co.uk.").is_ok());
        assert!(validate_domain("_dmarc.example.com").is_ok());
        assert!(validate_domain("localhost").is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", ".", "exa mple.com", "-bad.com", "bad-.com", "a..b", "https://x.com"] {
            assert!(
                matches!(validate_domain(bad), Err(WatchrError::InvalidDomain(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_domain(&format!("{}.com", "a".repeat(64))).is_err());
    }
}
