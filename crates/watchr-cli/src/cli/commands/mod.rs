//! Command implementations.

pub mod check;
pub mod view;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;
use watchr::{Verifier, WatchrConfig};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit configuration file, if one was given
    pub config_path: Option<PathBuf>,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbosity level (number of `-v`)
    pub verbose: u8,

    /// Disable colors
    pub no_color: bool,
}

impl Context {
    /// Load the configuration the checks run against.
    pub fn config(&self) -> Result<WatchrConfig> {
        let (path, config) = crate::config::load(self.config_path.as_deref())?;
        debug!(path = %path.display(), subject = %config.subject, "configuration loaded");
        Ok(config)
    }

    /// Configuration for an ad-hoc lookup of `domain`.
    ///
    /// Client settings come from the configuration file when one is available.
    pub fn lookup_config(&self, domain: &str) -> Result<WatchrConfig> {
        let mut lookup = WatchrConfig::new(domain);
        match self.config() {
            Ok(config) => lookup.client = config.client,
            Err(e) if self.config_path.is_some() => return Err(e),
            Err(e) => debug!(error = %e, "using default client settings"),
        }
        Ok(lookup)
    }
}

/// Build a verifier wired to the real network collaborators.
pub fn verifier(config: WatchrConfig) -> Result<Verifier> {
    Ok(Verifier::from_config(config)?)
}
