//! Output formatting for different formats.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl OutputFormat {
    /// Print `value` in a machine-readable format; returns false for [`Self::Pretty`]
    pub fn emit<T: Serialize>(self, value: &T) -> anyhow::Result<bool> {
        match self {
            Self::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Self::Yaml => print!("{}", serde_yaml::to_string(value)?),
            Self::Pretty => return Ok(false),
        }
        Ok(true)
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json, yaml",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}
