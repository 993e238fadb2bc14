//! `watchr view` - Show the certificate chain or registration data of a domain.

use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use watchr::{checks::elapsed, DomainInfo, FetchedChain};

use super::{verifier, Context};
use crate::cli::args::{ViewArgs, ViewCommands};

#[derive(Tabled)]
struct CertificateRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Issuer")]
    issuer: String,
    #[tabled(rename = "Valid To")]
    valid_to: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "CA")]
    authority: bool,
}

pub async fn execute(ctx: Context, args: ViewArgs) -> Result<ExitCode> {
    match args.command {
        ViewCommands::Certificate { domain, pem } => view_certificate(&ctx, &domain, pem).await,
        ViewCommands::Domain { domain } => view_domain(&ctx, &domain).await,
    }
}

async fn view_certificate(ctx: &Context, domain: &str, pem: bool) -> Result<ExitCode> {
    let verifier = verifier(ctx.lookup_config(domain)?)?;
    let mut fetched = verifier.fetch_chain(domain).await?;
    if !pem {
        fetched.chain = fetched.chain.without_pem();
    }

    if !ctx.output_format.emit(&fetched)? {
        print_chain_pretty(&fetched, Utc::now());
    }
    Ok(ExitCode::SUCCESS)
}

async fn view_domain(ctx: &Context, domain: &str) -> Result<ExitCode> {
    let verifier = verifier(ctx.lookup_config(domain)?)?;
    let info = verifier.resolve_domain(domain).await?;

    if !ctx.output_format.emit(&info)? {
        print_domain_pretty(&info, Utc::now());
    }
    Ok(ExitCode::SUCCESS)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `in 3 months` or `2 days ago`
fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = at - now;
    if delta >= chrono::Duration::zero() {
        format!("in {}", elapsed(delta))
    } else {
        format!("{} ago", elapsed(delta))
    }
}

fn print_chain_pretty(fetched: &FetchedChain, now: DateTime<Utc>) {
    println!(
        "{} {}:{}",
        "Host:".bold(),
        fetched.host.cyan().bold(),
        fetched.port
    );
    if let Some(protocol) = &fetched.protocol {
        println!("  {} {}", "Protocol:".bold(), protocol);
    }
    if let Some(cipher) = &fetched.cipher_suite {
        println!("  {} {}", "Cipher suite:".bold(), cipher);
    }
    println!("  {} {}", "Chain size:".bold(), fetched.chain.len());
    println!();

    let rows: Vec<CertificateRow> = fetched
        .chain
        .iter()
        .enumerate()
        .map(|(position, cert)| CertificateRow {
            position,
            subject: cert.subject_common_name.clone().unwrap_or_default(),
            issuer: cert
                .issuer_common_name
                .clone()
                .or_else(|| cert.issuer_organization.clone())
                .unwrap_or_default(),
            valid_to: timestamp(cert.valid_to),
            serial: cert.serial_number.clone(),
            authority: cert.certificate_authority,
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()).to_string());

    let Ok(leaf) = fetched.chain.leaf() else {
        return;
    };
    println!();
    println!("{}", "Leaf certificate:".bold().underline());
    println!(
        "  {} {} ({})",
        "Valid from:".bold(),
        timestamp(leaf.valid_from),
        relative(leaf.valid_from, now)
    );
    let expiry = relative(leaf.valid_to, now);
    let expiry = if leaf.valid_to <= now {
        expiry.red()
    } else {
        expiry.green()
    };
    println!("  {} {} ({})", "Valid to:".bold(), timestamp(leaf.valid_to), expiry);
    if !leaf.subject_alternative_names.is_empty() {
        println!(
            "  {} {}",
            "Alternative names:".bold(),
            leaf.subject_alternative_names.join(", ")
        );
    }
    println!("  {} {}", "Signature:".bold(), leaf.signature_type_long_name);
    println!("  {} {}", "Public key:".bold(), leaf.public_key_algorithm);
    println!("  {} {}", "SHA-1:".bold(), leaf.sha1_fingerprint);
    println!("  {} {}", "SHA-256:".bold(), leaf.sha256_fingerprint);
    let usage = leaf.key_usage.names();
    if !usage.is_empty() {
        println!("  {} {}", "Key usage:".bold(), usage.join(", "));
    }
    if let Some(url) = &leaf.ocsp_responder_url {
        println!("  {} {}", "OCSP responder:".bold(), url);
    }
}

fn print_domain_pretty(info: &DomainInfo, now: DateTime<Utc>) {
    println!("{} {}", "Domain:".bold(), info.domain_name.cyan().bold());
    println!();

    if !info.registrar.is_empty() {
        println!("  {} {}", "Registrar:".bold(), info.registrar);
    }
    if !info.owner.is_empty() {
        println!("  {} {}", "Owner:".bold(), info.owner);
    }
    if !info.whois_server.is_empty() {
        println!("  {} {}", "Source:".bold(), info.whois_server);
    }

    for (label, date) in [
        ("Created:", info.creation_date),
        ("Updated:", info.updated_date),
        ("Expires:", info.expiration_date),
    ] {
        if let Some(at) = date {
            println!(
                "  {} {} ({})",
                label.bold(),
                timestamp(at),
                relative(at, now)
            );
        }
    }

    println!(
        "  {} {}",
        "DNSSEC:".bold(),
        if info.dnssec.is_some() {
            "signed".green()
        } else {
            "unsigned".yellow()
        }
    );

    if !info.states.is_empty() {
        println!();
        println!("{}", "Status flags:".bold().underline());
        for state in &info.states {
            println!("  {} {}", "-".green(), state);
        }
    }

    if !info.name_servers.is_empty() {
        println!();
        println!("{}", "Name servers:".bold().underline());
        for server in &info.name_servers {
            println!("  {server}");
        }
    }
}
