//! # watchr-cli
//!
//! Command-line interface for the watchr verification engine.
//!
//! ## Features
//!
//! - **Checks**: `check certificate`, `check domain` and `check all` against a
//!   `watchr.json` or `watchr.toml` configuration
//! - **Inspection**: `view certificate` and `view domain` print what a host or
//!   registry reports
//! - **Multiple output formats**: Pretty tables, JSON, YAML
//! - **Exit codes**: 0 when every check passes, 1 otherwise

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
