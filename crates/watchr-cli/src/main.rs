//! watchr - certificate and domain verification
//!
//! Exits 0 when every check passes and 1 otherwise.

use std::process::ExitCode;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    watchr_cli::run().await
}
