//! `credential_process`: an external command that prints credentials as JSON.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

use super::Credentials;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProcessOutput {
    version: u32,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

pub(crate) fn run(command: &str) -> Result<Credentials> {
    debug!(%command, "running credential_process");
    let output = shell(command)
        .output()
        .with_context(|| format!("Failed to run credential_process '{command}'"))?;

    if !output.status.success() {
        bail!(
            "credential_process '{command}' failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse(&output.stdout)
}

fn parse(stdout: &[u8]) -> Result<Credentials> {
    let parsed: ProcessOutput =
        serde_json::from_slice(stdout).context("credential_process printed invalid JSON")?;
    if parsed.version != 1 {
        bail!("Unsupported credential_process output version {}", parsed.version);
    }
    Ok(Credentials::new(
        parsed.access_key_id,
        parsed.secret_access_key,
        parsed.session_token,
    ))
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
