//! Verification orchestrator.
//!
//! Each run moves through `Idle -> Fetching -> Evaluating -> Passed | Failed`.
//! Fetch and resolve errors end a run as `Failed`; predicate failures are
//! collected as messages and never raised.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};
use watchr_client::constants::OCSP_RESPONSE_MEDIA_TYPE;
use watchr_client::WatchrClient;
use watchr_core::{
    validate_domain, Certificate, CertificateChain, ChainFetcher, DomainInfo, DomainLookup,
    FetchedChain, Result, RevocationChecker, RevocationReason, WatchrError,
};
use watchr_recon::DomainResolver;

use crate::checks::{
    elapsed, expiry, issuer_matches, normalize_fingerprint, normalize_serial, subject_matches,
    ExpiryVerdict,
};
use crate::config::{Positional, WatchrConfig};

/// Lifecycle of a single verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Idle,
    Fetching,
    Evaluating,
    Passed,
    Failed,
}

/// Result of one run against one hostname or domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Hostname or domain the run was about
    pub subject: String,
    pub passed: bool,
    /// Failed predicates, in evaluation order
    pub errors: Vec<String>,
    /// Non-fatal findings, such as expectation lists longer than the chain
    pub warnings: Vec<String>,
}

impl Evaluation {
    /// True when every evaluation in `runs` passed
    #[must_use]
    pub fn all_passed(runs: &[Self]) -> bool {
        runs.iter().all(|run| run.passed)
    }
}

/// Marker returned once a fail-fast ledger records its first error
struct Halt;

type Step = std::result::Result<(), Halt>;

struct Ledger {
    fail_fast: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Ledger {
    const fn new(fail_fast: bool) -> Self {
        Self {
            fail_fast,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn fail(&mut self, message: String) -> Step {
        debug!(error = %message, "check failed");
        self.errors.push(message);
        if self.fail_fast {
            Err(Halt)
        } else {
            Ok(())
        }
    }

    fn warn(&mut self, message: String) {
        debug!(warning = %message, "check warning");
        self.warnings.push(message);
    }

    fn finish(self, run: &mut Run<'_>) -> Evaluation {
        let passed = self.errors.is_empty();
        run.advance(if passed { Stage::Passed } else { Stage::Failed });
        Evaluation {
            subject: run.subject.to_string(),
            passed,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

struct Run<'a> {
    subject: &'a str,
    stage: Stage,
}

impl<'a> Run<'a> {
    fn start(subject: &'a str) -> Self {
        debug!(subject = %subject, stage = ?Stage::Idle, "verification run created");
        Self {
            subject,
            stage: Stage::Idle,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(subject = %self.subject, from = ?self.stage, to = ?next, "stage transition");
        self.stage = next;
    }
}

/// Runs certificate and domain checks for one configured subject
#[derive(Clone)]
pub struct Verifier {
    fetcher: Arc<dyn ChainFetcher>,
    revocation: Arc<dyn RevocationChecker>,
    lookup: Arc<dyn DomainLookup>,
    config: WatchrConfig,
}

impl Verifier {
    pub fn new(
        config: WatchrConfig,
        fetcher: Arc<dyn ChainFetcher>,
        revocation: Arc<dyn RevocationChecker>,
        lookup: Arc<dyn DomainLookup>,
    ) -> Self {
        Self {
            fetcher,
            revocation,
            lookup,
            config,
        }
    }

    /// Wire the network collaborators described by `config.client`
    pub fn from_config(config: WatchrConfig) -> Result<Self> {
        let client = WatchrClient::builder().config(config.client.clone()).build()?;
        let resolver = DomainResolver::from_client(&client)?;
        let client = Arc::new(client);

        Ok(Self::new(
            config,
            Arc::clone(&client) as Arc<dyn ChainFetcher>,
            client,
            Arc::new(resolver),
        ))
    }

    pub const fn config(&self) -> &WatchrConfig {
        &self.config
    }

    /// Fetch the chain a host presents, without evaluating it
    pub async fn fetch_chain(&self, domain: &str) -> Result<FetchedChain> {
        self.fetcher.fetch(domain).await
    }

    /// Resolve registration data, without evaluating it
    pub async fn resolve_domain(&self, domain: &str) -> Result<DomainInfo> {
        self.lookup.resolve(domain).await
    }

    /// Certificate checks for every configured hostname
    pub async fn check_certificates(&self) -> Vec<Evaluation> {
        self.check_certificates_at(Utc::now()).await
    }

    pub async fn check_domain(&self) -> Evaluation {
        self.check_domain_at(Utc::now()).await
    }

    pub async fn check_all(&self) -> Vec<Evaluation> {
        self.check_all_at(Utc::now()).await
    }

    /// Certificate checks for the subject and each `{host}.{subject}`.
    ///
    /// Returns nothing when certificate checks are disabled. With fail-fast on,
    /// stops after the first host that fails.
    pub async fn check_certificates_at(&self, now: DateTime<Utc>) -> Vec<Evaluation> {
        if !self.config.certificate.enabled {
            info!(subject = %self.config.subject, "certificate checks are disabled");
            return Vec::new();
        }

        let mut runs = Vec::new();
        for hostname in self.config.hostnames() {
            let evaluation = self.check_host_at(&hostname, now).await;
            let failed = !evaluation.passed;
            runs.push(evaluation);
            if failed && self.config.fail_fast {
                debug!(host = %hostname, "fail-fast: skipping remaining hosts");
                break;
            }
        }
        runs
    }

    /// Fetch and evaluate the chain presented by one hostname
    pub async fn check_host_at(&self, hostname: &str, now: DateTime<Utc>) -> Evaluation {
        let mut run = Run::start(hostname);
        run.advance(Stage::Fetching);

        let fetched = match self.fetcher.fetch(hostname).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let mut ledger = Ledger::new(self.config.fail_fast);
                let _ = ledger.fail(format!(
                    "Failed to retrieve the certificate for hostname \"{hostname}\": {e}"
                ));
                return ledger.finish(&mut run);
            }
        };
        debug!(
            host = %hostname,
            chain = fetched.chain.len(),
            protocol = ?fetched.protocol,
            cipher_suite = ?fetched.cipher_suite,
            "certificate chain retrieved"
        );

        self.evaluate(&mut run, &fetched.chain, now).await
    }

    /// Evaluate an already-fetched chain for `hostname`
    pub async fn evaluate_chain_at(
        &self,
        hostname: &str,
        chain: &CertificateChain,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let mut run = Run::start(hostname);
        self.evaluate(&mut run, chain, now).await
    }

    async fn evaluate(
        &self,
        run: &mut Run<'_>,
        chain: &CertificateChain,
        now: DateTime<Utc>,
    ) -> Evaluation {
        run.advance(Stage::Evaluating);
        let mut ledger = Ledger::new(self.config.fail_fast);
        self.list_warnings(&mut ledger, chain);

        if self
            .chain_predicates(&mut ledger, run.subject, chain, now)
            .await
            .is_err()
        {
            debug!(host = %run.subject, "fail-fast: halted at first failure");
        }
        ledger.finish(run)
    }

    fn list_warnings(&self, ledger: &mut Ledger, chain: &CertificateChain) {
        let checks = &self.config.certificate;
        for (key, list) in [
            ("sha1Fingerprint", &checks.sha1_fingerprint),
            ("sha256Fingerprint", &checks.sha256_fingerprint),
            ("serialNumber", &checks.serial_number),
            ("issuerName", &checks.issuer_name),
        ] {
            if list.len() > chain.len() {
                ledger.warn(format!(
                    "{key} lists {} entries but the chain has {} certificates; extra entries were skipped",
                    list.len(),
                    chain.len()
                ));
            }
        }
    }

    async fn chain_predicates(
        &self,
        ledger: &mut Ledger,
        hostname: &str,
        chain: &CertificateChain,
        now: DateTime<Utc>,
    ) -> Step {
        let checks = &self.config.certificate;
        let Ok(leaf) = chain.leaf() else {
            return ledger.fail(format!(
                "Failed to retrieve the certificate for hostname \"{hostname}\""
            ));
        };

        if !subject_matches(hostname, leaf.subject_names()) {
            ledger.fail(format!(
                "Hostname \"{hostname}\" does not match the certificate subject ({}) or any of the alternative names ({})",
                leaf.subject_common_name.as_deref().unwrap_or_default(),
                leaf.subject_alternative_names.join(", ")
            ))?;
        }

        let threshold = checks.expiration_threshold;
        match expiry(leaf.valid_to, now, threshold) {
            ExpiryVerdict::Expired { overdue } => ledger.fail(format!(
                "Certificate for hostname \"{hostname}\" has expired {} ago",
                elapsed(overdue)
            ))?,
            ExpiryVerdict::ExpiringSoon { days } => ledger.fail(format!(
                "Certificate for hostname \"{hostname}\" will expire in {days} days (threshold: {threshold})"
            ))?,
            ExpiryVerdict::Ok { days } => {
                debug!(host = %hostname, days, "certificate expiry within bounds");
            }
            ExpiryVerdict::Disabled => {}
        }

        positional(ledger, chain, &checks.sha1_fingerprint, |position, cert, expected| {
            (cert.sha1_fingerprint != normalize_fingerprint(expected)).then(|| {
                format!(
                    "Certificate SHA-1 Fingerprint \"{}\" for hostname \"{hostname}\" does not match the expected fingerprint \"{expected}\"{}",
                    cert.sha1_fingerprint,
                    at_position(position)
                )
            })
        })?;

        positional(ledger, chain, &checks.sha256_fingerprint, |position, cert, expected| {
            (cert.sha256_fingerprint != normalize_fingerprint(expected)).then(|| {
                format!(
                    "Certificate SHA-256 Fingerprint \"{}\" for hostname \"{hostname}\" does not match the expected fingerprint \"{expected}\"{}",
                    cert.sha256_fingerprint,
                    at_position(position)
                )
            })
        })?;

        positional(ledger, chain, &checks.serial_number, |position, cert, expected| {
            (normalize_serial(&cert.serial_number) != normalize_serial(expected)).then(|| {
                format!(
                    "Certificate Serial Number \"{}\" for hostname \"{hostname}\" does not match the expected \"{expected}\"{}",
                    cert.serial_number,
                    at_position(position)
                )
            })
        })?;

        positional(ledger, chain, &checks.issuer_name, |position, cert, expected| {
            let organization = cert.issuer_organization.as_deref();
            let common_name = cert.issuer_common_name.as_deref();
            (!issuer_matches(organization, common_name, expected)).then(|| {
                format!(
                    "Certificate Issuer Name \"{}\" for hostname \"{hostname}\" does not match the expected \"{expected}\"{}",
                    organization.or(common_name).unwrap_or_default(),
                    at_position(position)
                )
            })
        })?;

        if checks.ocsp_revoked {
            self.revocation_predicate(ledger, hostname, chain).await?;
        }

        Ok(())
    }

    async fn revocation_predicate(
        &self,
        ledger: &mut Ledger,
        hostname: &str,
        chain: &CertificateChain,
    ) -> Step {
        let (Ok(leaf), Ok(issuer)) = (chain.at(0), chain.at(1)) else {
            return ledger.fail(format!(
                "Certificate for hostname \"{hostname}\" OCSP revocation state cannot be checked without the issuer certificate"
            ));
        };

        match self.revocation.check_revocation(leaf, issuer).await {
            Ok(status) => match status.revoked_on {
                Some(revoked_on) => ledger.fail(format!(
                    "Certificate for hostname \"{hostname}\" was revoked on {} (reason: {})",
                    revoked_on.to_rfc3339_opts(SecondsFormat::Secs, true),
                    status
                        .revocation_reason
                        .unwrap_or(RevocationReason::Unspecified)
                )),
                None => {
                    debug!(
                        host = %hostname,
                        last_update = %status.last_update,
                        "certificate not revoked"
                    );
                    Ok(())
                }
            },
            Err(WatchrError::UnknownRevocationState { reason }) => {
                debug!(host = %hostname, reason = %reason, "OCSP state unknown");
                ledger.fail(format!(
                    "Certificate for hostname \"{hostname}\" OCSP revocation state is unknown"
                ))
            }
            Err(WatchrError::Responder { status, .. }) if status != 200 => {
                ledger.fail(format!("OCSP response status code is {status}"))
            }
            Err(WatchrError::Responder { content_type, .. }) => ledger.fail(format!(
                "OCSP response content type is \"{content_type}\", expected \"{OCSP_RESPONSE_MEDIA_TYPE}\""
            )),
            Err(e) => ledger.fail(e.to_string()),
        }
    }

    /// Resolve and evaluate registration data for the configured subject
    pub async fn check_domain_at(&self, now: DateTime<Utc>) -> Evaluation {
        let subject = self.config.subject.as_str();
        let mut run = Run::start(subject);

        if let Err(e) = validate_domain(subject) {
            let mut ledger = Ledger::new(self.config.fail_fast);
            let _ = ledger.fail(e.to_string());
            return ledger.finish(&mut run);
        }

        run.advance(Stage::Fetching);
        match self.lookup.resolve(subject).await {
            Ok(domain) => {
                run.advance(Stage::Evaluating);
                let mut ledger = Ledger::new(self.config.fail_fast);
                if self.domain_predicates(&mut ledger, &domain, now).is_err() {
                    debug!(domain = %subject, "fail-fast: halted at first failure");
                }
                ledger.finish(&mut run)
            }
            Err(e) => {
                let mut ledger = Ledger::new(self.config.fail_fast);
                let _ = ledger.fail(e.to_string());
                ledger.finish(&mut run)
            }
        }
    }

    /// Evaluate already-resolved registration data
    pub fn evaluate_domain_at(&self, domain: &DomainInfo, now: DateTime<Utc>) -> Evaluation {
        let mut run = Run::start(&domain.domain_name);
        run.advance(Stage::Evaluating);
        let mut ledger = Ledger::new(self.config.fail_fast);
        if self.domain_predicates(&mut ledger, domain, now).is_err() {
            debug!(domain = %domain.domain_name, "fail-fast: halted at first failure");
        }
        ledger.finish(&mut run)
    }

    fn domain_predicates(&self, ledger: &mut Ledger, domain: &DomainInfo, now: DateTime<Utc>) -> Step {
        let checks = &self.config.domain;

        let threshold = checks.expiration_threshold;
        if threshold > 0 {
            match domain.expiration_date {
                None => ledger.fail("Failed to retrieve the expiration date".to_string())?,
                Some(at) => match expiry(at, now, threshold) {
                    ExpiryVerdict::Expired { overdue } => {
                        ledger.fail(format!("Domain has expired {} ago", elapsed(overdue)))?;
                    }
                    ExpiryVerdict::ExpiringSoon { days } => ledger.fail(format!(
                        "Domain will expire in {days} days (threshold: {threshold})"
                    ))?,
                    ExpiryVerdict::Ok { days } => {
                        debug!(domain = %domain.domain_name, days, "domain expiry within bounds");
                    }
                    ExpiryVerdict::Disabled => {}
                },
            }
        }

        if let Some(expected) = checks.registrar_name.as_deref() {
            let found = domain.registrar.trim();
            if found.is_empty() {
                ledger.fail("Failed to retrieve the registrar name".to_string())?;
            } else if found != expected.trim() {
                ledger.fail(format!(
                    "Registrar name does not match the expected name \"{expected}\", found: \"{found}\""
                ))?;
            }
        }

        if !checks.status_flags.is_empty() {
            if domain.states.is_empty() {
                ledger.fail("Failed to retrieve the status flags".to_string())?;
            } else {
                let missing = domain.missing_states(&checks.status_flags);
                if !missing.is_empty() {
                    ledger.fail(format!(
                        "Not all required status flags are active (missing: {})",
                        missing.join(", ")
                    ))?;
                }
            }
        }

        Ok(())
    }

    /// Domain then certificate checks.
    ///
    /// Without fail-fast both run concurrently. With fail-fast the certificate
    /// checks are skipped once the domain check fails.
    pub async fn check_all_at(&self, now: DateTime<Utc>) -> Vec<Evaluation> {
        let mut runs = Vec::new();

        if self.config.fail_fast {
            if self.config.domain.enabled {
                let domain = self.check_domain_at(now).await;
                let failed = !domain.passed;
                runs.push(domain);
                if failed {
                    return runs;
                }
            }
            runs.extend(self.check_certificates_at(now).await);
            return runs;
        }

        let domain = async {
            if self.config.domain.enabled {
                Some(self.check_domain_at(now).await)
            } else {
                info!(subject = %self.config.subject, "domain checks are disabled");
                None
            }
        };
        let (domain, certificates) =
            futures_util::join!(domain, self.check_certificates_at(now));

        runs.extend(domain);
        runs.extend(certificates);
        runs
    }
}

fn positional<F>(ledger: &mut Ledger, chain: &CertificateChain, list: &Positional, mismatch: F) -> Step
where
    F: Fn(usize, &Certificate, &str) -> Option<String>,
{
    for (position, expected) in list.entries() {
        let Ok(cert) = chain.at(position) else {
            continue;
        };
        if let Some(message) = mismatch(position, cert, expected) {
            ledger.fail(message)?;
        }
    }
    Ok(())
}

fn at_position(position: usize) -> String {
    if position == 0 {
        String::new()
    } else {
        format!(" (chain position {position})")
    }
}
