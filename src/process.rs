//! External process invocation with an explicit timeout.
//!
//! Every external tool the bot reaches for (pivpn, qrencode, at) is a
//! single-attempt blocking call: VPN state mutation is not safely idempotent
//! to retry blindly, so a failure or timeout is surfaced to the caller as a
//! fatal-for-this-request error.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tokio::process::Command;

/// Upper bound on any single external tool invocation.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Run a program to completion, failing on non-zero exit or timeout.
pub async fn run(program: &str, args: &[&str]) -> Result<()> {
    run_with_timeout(program, args, TOOL_TIMEOUT).await
}

/// Run a shell command line (`sh -c`) to completion.
///
/// Used where the external tool needs stdin redirection or a pipeline, as
/// with `qrencode < file` and `... | at now + N days`.
pub async fn run_shell(command: &str) -> Result<()> {
    run_with_timeout("sh", &["-c", command], TOOL_TIMEOUT).await
}

pub async fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<()> {
    let output = tokio::time::timeout(timeout, Command::new(program).args(args).output())
        .await
        .map_err(|_| {
            anyhow::anyhow!("`{program}` timed out after {}s", timeout.as_secs())
        })?
        .with_context(|| format!("Failed to spawn `{program}`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{program}` exited with {}: {}",
            output.status,
            stderr.trim()
        );
    }
    Ok(())
}
