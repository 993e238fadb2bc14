//! Registration lookup combining the structured and legacy registries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;
use watchr_core::{
    validate_domain, DnsSec, DomainInfo, DomainLookup, LegacyRegistry, RdapDomain, Result,
    StructuredRegistry, WatchrError, WhoisRecord,
};

/// Source recorded in [`DomainInfo::whois_server`] for RDAP answers
pub const DEFAULT_RDAP_SOURCE: &str = "https://rdap.org/domain/";

/// Resolves registration data, preferring RDAP and falling back to WHOIS
#[derive(Clone)]
pub struct DomainResolver {
    structured: Arc<dyn StructuredRegistry>,
    legacy: Arc<dyn LegacyRegistry>,
    rdap_source: String,
}

impl DomainResolver {
    /// Create a resolver over explicit registry collaborators
    #[must_use]
    pub fn new(structured: Arc<dyn StructuredRegistry>, legacy: Arc<dyn LegacyRegistry>) -> Self {
        Self {
            structured,
            legacy,
            rdap_source: DEFAULT_RDAP_SOURCE.to_string(),
        }
    }

    /// Resolver using `client` for RDAP and the bundled WHOIS server list
    #[cfg(feature = "whois")]
    pub fn from_client(client: &watchr_client::WatchrClient) -> crate::ReconResult<Self> {
        let whois = crate::whois::WhoisClient::with_timeout(client.config().timeout())?;
        Ok(Self::new(Arc::new(client.clone()), Arc::new(whois))
            .rdap_source(format!("{}/domain/", client.config().rdap_base_url)))
    }

    /// Set the label reported as the source of RDAP answers
    #[must_use]
    pub fn rdap_source(mut self, source: impl Into<String>) -> Self {
        self.rdap_source = source.into();
        self
    }
}

#[async_trait]
impl DomainLookup for DomainResolver {
    async fn resolve(&self, domain: &str) -> Result<DomainInfo> {
        validate_domain(domain)?;

        let structured = match self.structured.lookup(domain).await {
            Ok(Some(record)) if !record.is_empty() => {
                debug!(domain = %domain, "resolved via RDAP");
                return Ok(normalize_rdap(domain, &self.rdap_source, &record));
            }
            Ok(_) => "no registration data".to_string(),
            Err(e) => e.to_string(),
        };
        debug!(domain = %domain, reason = %structured, "RDAP lookup failed, falling back to WHOIS");

        let legacy = match self.legacy.lookup(domain).await {
            Ok(Some(record)) if !record.is_empty() => {
                debug!(domain = %domain, "resolved via WHOIS");
                return Ok(normalize_whois(domain, &record));
            }
            Ok(_) => "no registration data".to_string(),
            Err(e) => e.to_string(),
        };

        Err(WatchrError::Resolution {
            domain: domain.to_string(),
            structured,
            legacy,
        })
    }
}

/// Normalize an RDAP domain object
pub fn normalize_rdap(domain: &str, source: &str, record: &RdapDomain) -> DomainInfo {
    let registrar = record
        .entities
        .iter()
        .find(|entity| entity.has_role("registrar"))
        .and_then(|entity| entity.display_name())
        .map(|name| name.trim().to_string())
        .unwrap_or_default();

    let dnssec = record
        .secure_dns
        .as_ref()
        .filter(|secure| secure.delegation_signed)
        .map(|secure| {
            secure
                .ds_data
                .first()
                .map(|ds| DnsSec {
                    key_tag: ds.key_tag,
                    algorithm: ds.algorithm,
                    digest_type: ds.digest_type,
                    digest: ds.digest.clone(),
                })
                .unwrap_or_default()
        });

    let name_servers = record
        .nameservers
        .iter()
        .filter(|ns| ns.object_class_name.is_empty() || ns.object_class_name == "nameserver")
        .map(|ns| ns.ldh_name.trim_end_matches('.').to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    DomainInfo {
        domain_name: domain.to_ascii_lowercase(),
        whois_server: source.to_string(),
        name_servers,
        creation_date: rdap_event(record, "registration"),
        expiration_date: rdap_event(record, "expiration"),
        updated_date: rdap_event(record, "last changed"),
        states: record.status.iter().map(|s| strip_spaces(s)).collect(),
        owner: String::new(),
        registrar,
        dnssec,
    }
}

/// Normalize a parsed WHOIS answer
pub fn normalize_whois(domain: &str, record: &WhoisRecord) -> DomainInfo {
    let dnssec = record
        .dnssec
        .as_deref()
        .filter(|marker| marker.eq_ignore_ascii_case("signedDelegation"))
        .map(|_| DnsSec::default());

    DomainInfo {
        domain_name: domain.to_ascii_lowercase(),
        whois_server: record.whois_server.clone(),
        name_servers: record
            .name_servers
            .iter()
            .map(|ns| ns.to_ascii_lowercase())
            .collect(),
        creation_date: record.creation_date.and_then(from_timestamp),
        expiration_date: record.expiration_date.and_then(from_timestamp),
        updated_date: record.updated_date.and_then(from_timestamp),
        states: record.states.iter().map(|s| strip_spaces(s)).collect(),
        owner: record.owner.clone(),
        registrar: record.registrar.clone(),
        dnssec,
    }
}

fn rdap_event(record: &RdapDomain, action: &str) -> Option<DateTime<Utc>> {
    let raw = record.event_date(action)?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            debug!(action, date = raw, error = %e, "unparseable RDAP event date");
            None
        }
    }
}

fn from_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn strip_spaces(status: &str) -> String {
    status.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use watchr_core::{RdapDsData, RdapEntity, RdapEvent, RdapNameserver, RdapSecureDns};

    enum Answer<T> {
        Found(T),
        Nothing,
        Fail,
    }

    struct FakeRdap {
        answer: Answer<RdapDomain>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StructuredRegistry for FakeRdap {
        async fn lookup(&self, _domain: &str) -> Result<Option<RdapDomain>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Answer::Found(record) => Ok(Some(record.clone())),
                Answer::Nothing => Ok(None),
                Answer::Fail => Err(WatchrError::Http("RDAP server answered 500".into())),
            }
        }
    }

    struct FakeWhois {
        answer: Answer<WhoisRecord>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LegacyRegistry for FakeWhois {
        async fn lookup(&self, _domain: &str) -> Result<Option<WhoisRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Answer::Found(record) => Ok(Some(record.clone())),
                Answer::Nothing => Ok(None),
                Answer::Fail => Err(WatchrError::Whois("connection reset".into())),
            }
        }
    }

    fn rdap_record() -> RdapDomain {
        RdapDomain {
            ldh_name: Some("EXAMPLE.COM".into()),
            status: vec!["client transfer prohibited".into(), "active".into()],
            events: vec![
                RdapEvent {
                    event_action: "registration".into(),
                    event_date: "1995-08-14T04:00:00Z".into(),
                },
                RdapEvent {
                    event_action: "expiration".into(),
                    event_date: "2026-08-13T04:00:00Z".into(),
                },
            ],
            entities: vec![serde_json::from_str::<RdapEntity>(
                r#"{"roles": ["registrar"], "vcardArray": ["vcard", [["version", {}, "text", "4.0"], ["fn", {}, "text", " Example Registrar "]]]}"#,
            )
            .unwrap()],
            nameservers: vec![RdapNameserver {
                ldh_name: "A.IANA-SERVERS.NET".into(),
                object_class_name: "nameserver".into(),
            }],
            secure_dns: Some(RdapSecureDns {
                delegation_signed: true,
                ds_data: vec![RdapDsData {
                    key_tag: Some(370),
                    algorithm: Some(13),
                    digest_type: Some(2),
                    digest: Some("BE74".into()),
                }],
            }),
        }
    }

    fn whois_record() -> WhoisRecord {
        WhoisRecord {
            whois_server: "whois.iana.org".into(),
            registrar: "RESERVED-Internet Assigned Numbers Authority".into(),
            owner: "Internet Assigned Numbers Authority".into(),
            creation_date: Some(808_372_800),
            expiration_date: Some(1_786_593_600),
            updated_date: None,
            name_servers: vec!["A.IANA-SERVERS.NET".into()],
            states: vec!["clientDeleteProhibited".into()],
            dnssec: Some("signedDelegation".into()),
        }
    }

    fn resolver(
        rdap: Answer<RdapDomain>,
        whois: Answer<WhoisRecord>,
    ) -> (DomainResolver, Arc<FakeRdap>, Arc<FakeWhois>) {
        let rdap = Arc::new(FakeRdap {
            answer: rdap,
            calls: AtomicUsize::new(0),
        });
        let whois = Arc::new(FakeWhois {
            answer: whois,
            calls: AtomicUsize::new(0),
        });
        let resolver = DomainResolver::new(rdap.clone(), whois.clone());
        (resolver, rdap, whois)
    }

    #[tokio::test]
    async fn rdap_answer_wins_without_touching_whois() {
        let (resolver, _, whois) = resolver(Answer::Found(rdap_record()), Answer::Fail);
        let info = resolver.resolve("example.com").await.unwrap();

        assert_eq!(info.whois_server, DEFAULT_RDAP_SOURCE);
        assert_eq!(info.registrar, "Example Registrar");
        assert_eq!(info.owner, "");
        assert_eq!(info.name_servers, vec!["a.iana-servers.net"]);
        assert_eq!(info.states, vec!["clienttransferprohibited", "active"]);
        assert_eq!(
            info.expiration_date.unwrap().to_rfc3339(),
            "2026-08-13T04:00:00+00:00"
        );
        assert_eq!(info.updated_date, None);
        assert_eq!(info.dnssec.unwrap().key_tag, Some(370));
        assert_eq!(whois.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_rdap_record_falls_back_to_whois() {
        let (resolver, rdap, whois) = resolver(Answer::Nothing, Answer::Found(whois_record()));
        let info = resolver.resolve("example.com").await.unwrap();

        assert_eq!(rdap.calls.load(Ordering::SeqCst), 1);
        assert_eq!(whois.calls.load(Ordering::SeqCst), 1);
        assert_eq!(info.whois_server, "whois.iana.org");
        assert_eq!(info.name_servers, vec!["a.iana-servers.net"]);
        assert_eq!(info.creation_date.unwrap().timestamp(), 808_372_800);
        assert_eq!(info.dnssec, Some(DnsSec::default()));
    }

    #[tokio::test]
    async fn rdap_error_falls_back_to_whois() {
        let (resolver, _, _) = resolver(Answer::Fail, Answer::Found(whois_record()));
        let info = resolver.resolve("example.com").await.unwrap();
        assert_eq!(info.registrar, "RESERVED-Internet Assigned Numbers Authority");
    }

    #[tokio::test]
    async fn empty_rdap_record_falls_back_to_whois() {
        let (resolver, _, whois) =
            resolver(Answer::Found(RdapDomain::default()), Answer::Found(whois_record()));
        resolver.resolve("example.com").await.unwrap();
        assert_eq!(whois.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_sources_failing_is_a_resolution_error() {
        let (resolver, rdap, whois) = resolver(Answer::Fail, Answer::Nothing);
        match resolver.resolve("example.com").await {
            Err(WatchrError::Resolution {
                domain,
                structured,
                legacy,
            }) => {
                assert_eq!(domain, "example.com");
                assert!(structured.contains("500"));
                assert_eq!(legacy, "no registration data");
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
        assert_eq!(rdap.calls.load(Ordering::SeqCst), 1);
        assert_eq!(whois.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_domain_skips_both_sources() {
        let (resolver, rdap, whois) = resolver(Answer::Nothing, Answer::Nothing);
        let result = resolver.resolve("exa mple.com").await;
        assert!(matches!(result, Err(WatchrError::InvalidDomain(_))));
        assert_eq!(rdap.calls.load(Ordering::SeqCst), 0);
        assert_eq!(whois.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsigned_whois_marker_means_no_dnssec() {
        let mut record = whois_record();
        record.dnssec = Some("unsigned".into());
        assert_eq!(normalize_whois("example.com", &record).dnssec, None);
    }

    #[test]
    fn signed_rdap_without_ds_data_is_presence_only() {
        let mut record = rdap_record();
        record.secure_dns = Some(RdapSecureDns {
            delegation_signed: true,
            ds_data: Vec::new(),
        });
        let info = normalize_rdap("example.com", DEFAULT_RDAP_SOURCE, &record);
        assert_eq!(info.dnssec, Some(DnsSec::default()));

        record.secure_dns = Some(RdapSecureDns::default());
        let info = normalize_rdap("example.com", DEFAULT_RDAP_SOURCE, &record);
        assert_eq!(info.dnssec, None);
    }
}
