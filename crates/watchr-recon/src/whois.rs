//! WHOIS lookup integration using whois-rs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;
use watchr_client::constants::DEFAULT_TIMEOUT;
use watchr_core::{validate_domain, LegacyRegistry, Result, WatchrError, WhoisRecord};

use crate::error::{ReconError, ReconResult};

/// Date-time layouts seen in registry output, tried in order
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

/// Date-only layouts, read as midnight UTC
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%b-%Y", "%d.%m.%Y", "%Y.%m.%d", "%Y/%m/%d", "%d/%m/%Y",
];

/// WHOIS client
pub struct WhoisClient {
    whois: Arc<whois_rs::WhoIs>,
    timeout: Duration,
}

impl WhoisClient {
    /// Create a new WHOIS client
    pub fn new() -> ReconResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client whose lookups give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> ReconResult<Self> {
        // Load from embedded server list
        let whois = whois_rs::WhoIs::from_string(include_str!("whois_servers.json"))
            .map_err(|e| ReconError::Whois(e.to_string()))?;
        Ok(Self {
            whois: Arc::new(whois),
            timeout,
        })
    }

    /// Lookup WHOIS information for a domain. `Ok(None)` when nothing could be extracted.
    pub async fn lookup_domain(&self, domain: &str) -> ReconResult<Option<WhoisRecord>> {
        validate_domain(domain).map_err(|e| match e {
            WatchrError::InvalidDomain(msg) => ReconError::InvalidDomain(msg),
            other => ReconError::Whois(other.to_string()),
        })?;

        let mut options = whois_rs::WhoIsLookupOptions::from_string(domain.to_ascii_lowercase())
            .map_err(|e| ReconError::Whois(e.to_string()))?;
        options.timeout = Some(self.timeout);

        debug!(domain = %domain, "WHOIS query");
        let whois = Arc::clone(&self.whois);
        let task = tokio::task::spawn_blocking(move || whois.lookup(options));
        let raw = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| ReconError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| ReconError::Task(e.to_string()))?
            .map_err(|e| ReconError::Whois(e.to_string()))?;

        let record = parse_whois_response(&raw);
        if record.is_empty() {
            debug!(domain = %domain, "WHOIS answer carried no registration data");
            return Ok(None);
        }
        Ok(Some(record))
    }
}

#[async_trait]
impl LegacyRegistry for WhoisClient {
    async fn lookup(&self, domain: &str) -> Result<Option<WhoisRecord>> {
        self.lookup_domain(domain).await.map_err(Into::into)
    }
}

/// Parse raw WHOIS response into a record.
///
/// Scalar fields keep their first occurrence. A key with an empty value takes
/// every following line without a colon, up to the next key or blank line.
pub fn parse_whois_response(raw: &str) -> WhoisRecord {
    let mut record = WhoisRecord::default();
    let mut pending: Option<String> = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            pending = None;
            continue;
        }
        if line.starts_with('%') || line.starts_with('#') {
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) if !value.trim().is_empty() => {
                pending = None;
                apply_field(&mut record, &key.trim().to_ascii_lowercase(), value.trim());
            }
            Some((key, _)) => pending = Some(key.trim().to_ascii_lowercase()),
            None => {
                if let Some(key) = &pending {
                    apply_field(&mut record, key, line);
                }
            }
        }
    }

    record
}

fn apply_field(record: &mut WhoisRecord, key: &str, value: &str) {
    match key {
        "registrar" | "registrar name" | "sponsoring registrar" => {
            set_once(&mut record.registrar, value);
        }
        "registrar whois server" | "whois server" | "whois" => {
            set_once(&mut record.whois_server, value);
        }
        "registrant organization" | "registrant organisation" | "registrant" => {
            set_once(&mut record.owner, value);
        }
        "creation date" | "created" | "created on" | "registered on" | "registered"
        | "domain registration date" | "registration time" => {
            record.creation_date = record.creation_date.or_else(|| parse_whois_date(value));
        }
        "registry expiry date" | "registrar registration expiration date" | "expiration date"
        | "expiry date" | "expires" | "expires on" | "expire date" | "paid-till"
        | "domain expiration date" => {
            record.expiration_date = record.expiration_date.or_else(|| parse_whois_date(value));
        }
        "updated date" | "last updated" | "last-update" | "last modified" | "changed"
        | "modified" => {
            record.updated_date = record.updated_date.or_else(|| parse_whois_date(value));
        }
        "name server" | "nserver" | "nameserver" | "name servers" => {
            if let Some(server) = value.split_whitespace().next() {
                let server = server.trim_end_matches('.').to_ascii_lowercase();
                if !record.name_servers.contains(&server) {
                    record.name_servers.push(server);
                }
            }
        }
        "domain status" | "status" | "state" => {
            // Drop the trailing ICANN explanation URL
            if let Some(state) = value.split_whitespace().next() {
                if !record.states.iter().any(|s| s.eq_ignore_ascii_case(state)) {
                    record.states.push(state.to_string());
                }
            }
        }
        "dnssec" => {
            if record.dnssec.is_none() {
                record.dnssec = Some(value.to_string());
            }
        }
        _ => {}
    }
}

fn set_once(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

/// Parse a registry date into a Unix timestamp, assuming UTC when no offset is given
pub fn parse_whois_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.timestamp());
    }

    let value = value
        .trim_end_matches("(UTC)")
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|at| at.and_utc().timestamp())
}
