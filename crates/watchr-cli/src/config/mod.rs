//! Configuration file discovery.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use watchr::WatchrConfig;

/// Per-user configuration directory, e.g. `~/.config/watchr` on Linux.
pub fn user_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "watchr").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Where the configuration is read from.
///
/// An explicit path wins. Otherwise `watchr.json` then `watchr.toml` are looked
/// up in `cwd`, then in the per-user configuration directory.
pub fn locate(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    WatchrConfig::find_in(cwd)
        .or_else(|| user_dir().and_then(|dir| WatchrConfig::find_in(&dir)))
        .with_context(|| {
            format!(
                "No configuration file found.\n\n\
                 Looked for watchr.json and watchr.toml in {}{}.\n\
                 Pass one with --config <PATH>.",
                cwd.display(),
                user_dir()
                    .map(|dir| format!(" and {}", dir.display()))
                    .unwrap_or_default()
            )
        })
}

/// Locate, parse and validate the configuration.
pub fn load(explicit: Option<&Path>) -> Result<(PathBuf, WatchrConfig)> {
    let cwd = std::env::current_dir().context("Could not determine the working directory")?;
    let path = locate(explicit, &cwd)?;
    let config = WatchrConfig::load(&path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok((path, config))
}
