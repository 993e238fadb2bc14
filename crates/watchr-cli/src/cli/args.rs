//! Command-line argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Certificate and domain verification
///
/// Checks TLS certificate chains, OCSP revocation and domain registration
/// data against the expectations in a watchr.json or watchr.toml file.
#[derive(Parser, Debug)]
#[command(name = "watchr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: ./watchr.json, then ./watchr.toml)
    #[arg(short, long, env = "WATCHR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured checks; exits 1 when any check fails
    Check(CheckArgs),

    /// Show what a host or registry reports, without checking it
    View(ViewArgs),
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub command: CheckCommands,

    /// Stop at the first failing check (overrides the configuration)
    #[arg(long, global = true)]
    pub fail_fast: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckCommands {
    /// Check the certificate chain of the subject and its hosts
    Certificate,

    /// Check the subject's registration data
    Domain,

    /// Run domain and certificate checks
    All,
}

// ============================================================================
// View command
// ============================================================================

#[derive(Args, Debug)]
pub struct ViewArgs {
    #[command(subcommand)]
    pub command: ViewCommands,
}

#[derive(Subcommand, Debug)]
pub enum ViewCommands {
    /// Print the certificate chain a host presents
    Certificate {
        /// Hostname to connect to
        domain: String,

        /// Include the PEM encoding of each certificate
        #[arg(long)]
        pem: bool,
    },

    /// Print the registration data of a domain
    Domain {
        /// Domain name to look up
        domain: String,
    },
}
