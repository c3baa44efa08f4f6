//! Helpers for running the mlops-smoke binary in a sealed environment.

use std::net::TcpListener;
use std::process::{Command, Output};
use tempfile::TempDir;

pub const TEST_GROUP: &str = "demo-group";
pub const TEST_ENDPOINT: &str = "demo-endpoint";

/// Result of one binary run.
pub struct SmokeRun {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl SmokeRun {
    fn from_output(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }

    /// Index of the first stdout line containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.lines().iter().position(|l| l.contains(needle))
    }
}

/// Base command: empty environment, throwaway HOME, static test
/// credentials, no instance metadata, both planes pointed at `server_url`.
pub fn smoke_command(server_url: &str, home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mlops-smoke"));
    cmd.env_clear()
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env("AWS_ACCESS_KEY_ID", "AKIDTEST")
        .env("AWS_SECRET_ACCESS_KEY", "test-secret")
        .env("AWS_REGION", "us-east-1")
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env("AWS_ENDPOINT_URL", server_url)
        .env("MODEL_PACKAGE_GROUP_NAME", TEST_GROUP)
        .env("ENDPOINT_NAME", TEST_ENDPOINT);
    cmd
}

pub fn run_smoke(server_url: &str) -> SmokeRun {
    let home = TempDir::new().expect("Failed to create temp HOME");
    let output = smoke_command(server_url, &home)
        .output()
        .expect("Failed to run mlops-smoke");
    SmokeRun::from_output(output)
}

pub fn run_smoke_with(server_url: &str, configure: impl FnOnce(&mut Command)) -> SmokeRun {
    let home = TempDir::new().expect("Failed to create temp HOME");
    let mut cmd = smoke_command(server_url, &home);
    configure(&mut cmd);
    SmokeRun::from_output(cmd.output().expect("Failed to run mlops-smoke"))
}

/// URL of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
