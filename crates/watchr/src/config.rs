//! Check configuration, loaded from `watchr.json` or `watchr.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use watchr_client::ClientConfig;
use watchr_core::{validate_domain, Result, WatchrError};

use crate::checks::normalize_fingerprint;

/// File names searched when no configuration path is given, in order
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["watchr.json", "watchr.toml"];

/// Threshold value that turns an expiration check off
pub const THRESHOLD_DISABLED: i64 = -1;

/// Everything a verification run needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchrConfig {
    /// Domain under check
    pub subject: String,

    /// Stop at the first failing predicate
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub certificate: CertificateChecks,

    #[serde(default)]
    pub domain: DomainChecks,

    #[serde(default)]
    pub client: ClientConfig,
}

/// Certificate chain checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateChecks {
    #[serde(default)]
    pub enabled: bool,

    /// Days before `validTo` at which the leaf counts as expiring; `-1` disables
    #[serde(default = "default_threshold")]
    pub expiration_threshold: i64,

    #[serde(default)]
    pub sha1_fingerprint: Positional,

    #[serde(default)]
    pub sha256_fingerprint: Positional,

    #[serde(default)]
    pub serial_number: Positional,

    #[serde(default)]
    pub issuer_name: Positional,

    /// Ask the OCSP responder whether the leaf was revoked
    #[serde(default)]
    pub ocsp_revoked: bool,

    /// Extra host labels, checked as `{host}.{subject}`
    #[serde(default)]
    pub hosts: Vec<String>,
}

/// Registration checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainChecks {
    #[serde(default)]
    pub enabled: bool,

    /// Days before expiration at which the domain counts as expiring; `-1` disables
    #[serde(default = "default_threshold")]
    pub expiration_threshold: i64,

    #[serde(default)]
    pub registrar_name: Option<String>,

    /// EPP status flags that must all be present
    #[serde(default)]
    pub status_flags: Vec<String>,
}

const fn default_threshold() -> i64 {
    5
}

impl Default for CertificateChecks {
    fn default() -> Self {
        Self {
            enabled: false,
            expiration_threshold: default_threshold(),
            sha1_fingerprint: Positional::default(),
            sha256_fingerprint: Positional::default(),
            serial_number: Positional::default(),
            issuer_name: Positional::default(),
            ocsp_revoked: false,
            hosts: Vec::new(),
        }
    }
}

impl Default for DomainChecks {
    fn default() -> Self {
        Self {
            enabled: false,
            expiration_threshold: default_threshold(),
            registrar_name: None,
            status_flags: Vec::new(),
        }
    }
}

/// Expected values indexed by chain position; `None` skips that position.
///
/// Accepts a single string (position 0) or a list whose entries are strings,
/// `null` or `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<OneOrMany>", into = "Vec<Option<String>>")]
pub struct Positional(Vec<Option<String>>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

impl From<Option<OneOrMany>> for Positional {
    fn from(value: Option<OneOrMany>) -> Self {
        let entries = match value {
            None => Vec::new(),
            Some(OneOrMany::One(single)) => vec![Some(single)],
            Some(OneOrMany::Many(list)) => list,
        };
        Self::new(entries)
    }
}

impl From<Positional> for Vec<Option<String>> {
    fn from(value: Positional) -> Self {
        value.0
    }
}

impl Positional {
    /// Blank entries are treated as absent
    #[must_use]
    pub fn new(entries: Vec<Option<String>>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|entry| entry.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
                .collect(),
        )
    }

    /// Expectation for position 0 only
    #[must_use]
    pub fn leaf(value: impl Into<String>) -> Self {
        Self::new(vec![Some(value.into())])
    }

    /// Number of positions, set or not
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no position carries an expectation
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// `(position, expected)` for every set entry
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.as_deref().map(|v| (i, v)))
    }
}

impl WatchrConfig {
    /// Config for `subject` with every check disabled
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            fail_fast: false,
            certificate: CertificateChecks::default(),
            domain: DomainChecks::default(),
            client: ClientConfig::default(),
        }
    }

    /// Load and validate a config file; `.toml` files are TOML, anything else JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WatchrError::Config(format!("cannot read {}: {e}", path.display())))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config: Self = if is_toml {
            toml::from_str(&content)
                .map_err(|e| WatchrError::Config(format!("{}: {e}", path.display())))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| WatchrError::Config(format!("{}: {e}", path.display())))?
        };

        config.validate()?;
        Ok(config)
    }

    /// First of [`DEFAULT_CONFIG_FILES`] present in `dir`
    #[must_use]
    pub fn find_in(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Hostnames whose certificates are checked: the subject, then each `{host}.{subject}`
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        std::iter::once(self.subject.clone())
            .chain(
                self.certificate
                    .hosts
                    .iter()
                    .map(|host| format!("{host}.{}", self.subject)),
            )
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        validate_domain(&self.subject).map_err(|e| WatchrError::Config(format!("subject: {e}")))?;
        for hostname in self.hostnames().iter().skip(1) {
            validate_domain(hostname)
                .map_err(|e| WatchrError::Config(format!("certificate.hosts: {e}")))?;
        }

        check_threshold("certificate.expirationThreshold", self.certificate.expiration_threshold)?;
        check_threshold("domain.expirationThreshold", self.domain.expiration_threshold)?;

        check_entries("certificate.sha1Fingerprint", &self.certificate.sha1_fingerprint, |v| {
            is_hex_of_len(&normalize_fingerprint(v), 40)
        })?;
        check_entries("certificate.sha256Fingerprint", &self.certificate.sha256_fingerprint, |v| {
            is_hex_of_len(&normalize_fingerprint(v), 64)
        })?;
        check_entries("certificate.serialNumber", &self.certificate.serial_number, |v| {
            let digits = v
                .strip_prefix("0x")
                .or_else(|| v.strip_prefix("0X"))
                .unwrap_or(v);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit())
        })?;

        self.client.validate()
    }
}

fn check_threshold(key: &str, value: i64) -> Result<()> {
    if value < THRESHOLD_DISABLED {
        return Err(WatchrError::Config(format!(
            "{key} must be -1 (disabled) or greater, got {value}"
        )));
    }
    Ok(())
}

fn check_entries(key: &str, list: &Positional, valid: impl Fn(&str) -> bool) -> Result<()> {
    match list.entries().find(|(_, v)| !valid(v)) {
        Some((position, value)) => Err(WatchrError::Config(format!(
            "{key}[{position}] is not valid: {value:?}"
        ))),
        None => Ok(()),
    }
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHA1: &str = "2b8f1b57330dbba2d07a6c51f70ee90ddab9ad8e";

    #[test]
    fn test_default_config() {
        let config = WatchrConfig::new("example.com");
        assert!(!config.fail_fast);
        assert!(!config.certificate.enabled);
        assert_eq!(config.certificate.expiration_threshold, 5);
        assert_eq!(config.domain.expiration_threshold, 5);
        assert!(config.certificate.sha1_fingerprint.is_empty());
        assert_eq!(config.client, ClientConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = WatchrConfig::new("example.com");
        config.certificate.sha1_fingerprint = Positional::new(vec![None, Some(SHA1.into())]);
        config.domain.status_flags = vec!["clientTransferProhibited".into()];

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["failFast"], false);
        assert_eq!(json["certificate"]["sha1Fingerprint"][0], serde_json::Value::Null);
        assert_eq!(json["certificate"]["sha1Fingerprint"][1], SHA1);
        assert_eq!(json["domain"]["statusFlags"][0], "clientTransferProhibited");

        let back: WatchrConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn single_string_is_position_zero() {
        let config: WatchrConfig = serde_json::from_str(&format!(
            r#"{{"subject": "example.com", "certificate": {{"enabled": true, "sha1Fingerprint": "{SHA1}", "issuerName": null}}}}"#
        ))
        .unwrap();

        let entries: Vec<_> = config.certificate.sha1_fingerprint.entries().collect();
        assert_eq!(entries, vec![(0, SHA1)]);
        assert!(config.certificate.issuer_name.is_empty());
    }

    #[test]
    fn blank_entries_are_skipped() {
        let list = Positional::new(vec![Some(String::new()), None, Some(" R3 ".into())]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.entries().collect::<Vec<_>>(), vec![(2, "R3")]);
    }

    #[test]
    fn hostnames_prefix_the_subject() {
        let mut config = WatchrConfig::new("example.com");
        config.certificate.hosts = vec!["www".into(), "api".into()];
        assert_eq!(
            config.hostnames(),
            vec!["example.com", "www.example.com", "api.example.com"]
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = WatchrConfig::new("example.com");
        config.certificate.expiration_threshold = -2;
        assert!(matches!(config.validate(), Err(WatchrError::Config(_))));

        let mut config = WatchrConfig::new("example.com");
        config.certificate.sha1_fingerprint = Positional::leaf("abc");
        assert!(config.validate().is_err());

        let mut config = WatchrConfig::new("example.com");
        config.certificate.serial_number = Positional::leaf("0xZZ");
        assert!(config.validate().is_err());

        let mut config = WatchrConfig::new("example.com");
        config.certificate.hosts = vec!["bad host".into()];
        assert!(config.validate().is_err());

        assert!(WatchrConfig::new("not a domain").validate().is_err());
    }

    #[test]
    fn accepts_colon_separated_fingerprints_and_hex_serials() {
        let mut config = WatchrConfig::new("example.com");
        config.certificate.sha1_fingerprint = Positional::leaf(
            "2B:8F:1B:57:33:0D:BB:A2:D0:7A:6C:51:F7:0E:E9:0D:DA:B9:AD:8E",
        );
        config.certificate.serial_number = Positional::leaf("0x0ABC");
        config.certificate.expiration_threshold = THRESHOLD_DISABLED;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "subject": "example.com",
                "failFast": true,
                "certificate": {{"enabled": true, "expirationThreshold": 10, "hosts": ["www"]}},
                "domain": {{"enabled": true, "registrarName": "Example Registrar"}},
                "client": {{"timeout": 15}}
            }}"#
        )
        .unwrap();

        let config = WatchrConfig::load(file.path()).unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.certificate.expiration_threshold, 10);
        assert_eq!(config.domain.registrar_name.as_deref(), Some("Example Registrar"));
        assert_eq!(config.client.timeout_secs, 15);
        assert_eq!(config.client.connect_timeout_secs, 30);
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
subject = "example.com"

[certificate]
enabled = true
sha256Fingerprint = ["{}", ""]
ocspRevoked = true

[domain]
enabled = true
statusFlags = ["clientTransferProhibited", "clientDeleteProhibited"]
"#,
            "a".repeat(64)
        )
        .unwrap();

        let config = WatchrConfig::load(file.path()).unwrap();
        assert!(config.certificate.ocsp_revoked);
        assert_eq!(config.certificate.sha256_fingerprint.entries().count(), 1);
        assert_eq!(config.domain.status_flags.len(), 2);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"subject": "example.com", "failFast": "yes"}}"#).unwrap();
        assert!(matches!(
            WatchrConfig::load(file.path()),
            Err(WatchrError::Config(_))
        ));

        assert!(matches!(
            WatchrConfig::load(Path::new("/nonexistent/watchr.json")),
            Err(WatchrError::Config(_))
        ));
    }

    #[test]
    fn finds_json_before_toml() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(WatchrConfig::find_in(dir.path()), None);

        std::fs::write(dir.path().join("watchr.toml"), "subject = \"example.com\"").unwrap();
        assert_eq!(
            WatchrConfig::find_in(dir.path()),
            Some(dir.path().join("watchr.toml"))
        );

        std::fs::write(dir.path().join("watchr.json"), r#"{"subject": "example.com"}"#).unwrap();
        assert_eq!(
            WatchrConfig::find_in(dir.path()),
            Some(dir.path().join("watchr.json"))
        );
    }
}
