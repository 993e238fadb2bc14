//! `watchr check` - Run the configured certificate and domain checks.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use watchr::{Evaluation, Positional, WatchrConfig};

use super::{verifier, Context};
use crate::cli::args::{CheckArgs, CheckCommands};
use crate::output::OutputFormat;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    passed: bool,
    evaluations: &'a [Evaluation],
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Check")]
    name: &'static str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Expected")]
    expected: String,
}

impl CheckRow {
    fn new(name: &'static str, enabled: bool, expected: String) -> Self {
        let status = if enabled {
            "enabled".green().to_string()
        } else {
            "disabled".red().to_string()
        };
        Self {
            name,
            status,
            expected: if enabled { expected } else { String::new() },
        }
    }

    fn positional(name: &'static str, list: &Positional) -> Self {
        let expected = list
            .entries()
            .map(|(position, value)| format!("#{position} {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(name, !list.is_empty(), expected)
    }
}

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<ExitCode> {
    let mut config = ctx.config()?;
    if args.fail_fast {
        config.fail_fast = true;
    }

    if ctx.verbose > 0 && ctx.output_format == OutputFormat::Pretty {
        print_enabled_checks(&config, args.command);
    }

    let domain_enabled = config.domain.enabled;
    let certificate_enabled = config.certificate.enabled;
    let verifier = verifier(config)?;

    let evaluations = match args.command {
        CheckCommands::Certificate => verifier.check_certificates().await,
        CheckCommands::Domain if domain_enabled => vec![verifier.check_domain().await],
        CheckCommands::Domain => Vec::new(),
        CheckCommands::All => verifier.check_all().await,
    };

    let passed = Evaluation::all_passed(&evaluations);
    let report = Report {
        passed,
        evaluations: &evaluations,
    };

    if !ctx.output_format.emit(&report)? {
        let disabled = match args.command {
            CheckCommands::Certificate => (!certificate_enabled).then_some("Certificate"),
            CheckCommands::Domain => (!domain_enabled).then_some("Domain"),
            CheckCommands::All => {
                (!certificate_enabled && !domain_enabled).then_some("Domain and certificate")
            }
        };
        if let Some(kind) = disabled {
            println!("{}", format!("{kind} checks are disabled in the configuration").yellow());
        }
        print_evaluations(&evaluations);
    }

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_evaluations(evaluations: &[Evaluation]) {
    for evaluation in evaluations {
        if evaluation.passed {
            println!("{} {}", "PASS".green().bold(), evaluation.subject.cyan());
        } else {
            println!("{} {}", "FAIL".red().bold(), evaluation.subject.cyan());
        }

        for error in &evaluation.errors {
            println!("  {} {}", "-".red(), error);
        }
        for warning in &evaluation.warnings {
            println!("  {} {}", "!".yellow(), warning.yellow());
        }
    }

    let failed = evaluations.iter().filter(|e| !e.passed).count();
    if !evaluations.is_empty() {
        println!();
        if failed == 0 {
            println!("{}", format!("All {} checks passed", evaluations.len()).green());
        } else {
            println!(
                "{}",
                format!("{failed} of {} checks failed", evaluations.len()).red()
            );
        }
    }
}

fn print_enabled_checks(config: &WatchrConfig, command: CheckCommands) {
    println!("{} {}", "Subject:".bold(), config.subject.cyan());
    println!("{} {}", "Fail fast:".bold(), config.fail_fast);
    println!();

    if command != CheckCommands::Domain {
        let checks = &config.certificate;
        let threshold = checks.expiration_threshold;
        let rows = vec![
            CheckRow::new(
                "Hosts",
                checks.enabled,
                config.hostnames().join("\n"),
            ),
            CheckRow::new(
                "Expiration date",
                checks.enabled && threshold > 0,
                format!("threshold: {threshold} days"),
            ),
            CheckRow::positional("SHA-1 fingerprint", &checks.sha1_fingerprint),
            CheckRow::positional("SHA-256 fingerprint", &checks.sha256_fingerprint),
            CheckRow::positional("Serial number", &checks.serial_number),
            CheckRow::positional("Issuer name", &checks.issuer_name),
            CheckRow::new("OCSP revoked", checks.ocsp_revoked, "not revoked".to_string()),
        ];
        println!("{}", "Certificate checks:".bold().underline());
        println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
        println!();
    }

    if command != CheckCommands::Certificate {
        let checks = &config.domain;
        let threshold = checks.expiration_threshold;
        let rows = vec![
            CheckRow::new(
                "Expiration date",
                checks.enabled && threshold > 0,
                format!("threshold: {threshold} days"),
            ),
            CheckRow::new(
                "Registrar name",
                checks.enabled && checks.registrar_name.is_some(),
                checks.registrar_name.clone().unwrap_or_default(),
            ),
            CheckRow::new(
                "Status flags",
                checks.enabled && !checks.status_flags.is_empty(),
                checks.status_flags.join("\n"),
            ),
        ];
        println!("{}", "Domain checks:".bold().underline());
        println!("{}", Table::new(&rows).with(Style::rounded()).to_string());
        println!();
    }
}
