//! EC2 instance metadata service (IMDSv2, falling back to IMDSv1).

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;

use super::{parse_session_credentials, Credentials};

pub const DISABLED_ENV: &str = "AWS_EC2_METADATA_DISABLED";
pub const ENDPOINT_ENV: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";

const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_PATH: &str = "/latest/api/token";
const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL_SECS: &str = "21600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImdsSource {
    endpoint: String,
}

impl ImdsSource {
    /// `None` when `AWS_EC2_METADATA_DISABLED=true`.
    pub fn from_env(lookup: &dyn Fn(&str) -> Option<String>) -> Option<Self> {
        if lookup(DISABLED_ENV).is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return None;
        }
        let endpoint = lookup(ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Some(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn fetch(&self, client: &Client) -> Result<Credentials> {
        let token = self.session_token(client)?;

        let roles = self.get(client, CREDENTIALS_PATH, token.as_deref())?;
        let role = roles
            .lines()
            .map(str::trim)
            .find(|r| !r.is_empty())
            .context("No IAM role is attached to this instance")?;

        let body = self.get(client, &format!("{CREDENTIALS_PATH}{role}"), token.as_deref())?;
        parse_session_credentials(&body, "instance metadata service")
    }

    /// `None` when the service only speaks IMDSv1.
    fn session_token(&self, client: &Client) -> Result<Option<String>> {
        let response = client
            .put(format!("{}{TOKEN_PATH}", self.endpoint))
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS)
            .send()
            .with_context(|| format!("Failed to reach instance metadata service at {}", self.endpoint))?;

        match response.status().as_u16() {
            200..=299 => {
                let token = response.text().context("Failed to read metadata token")?;
                Ok(Some(token.trim().to_string()))
            }
            404 | 405 => Ok(None),
            code => bail!("Instance metadata token request failed with HTTP {code}"),
        }
    }

    fn get(&self, client: &Client, path: &str, token: Option<&str>) -> Result<String> {
        let mut request = client.get(format!("{}{path}", self.endpoint));
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .with_context(|| format!("Failed to reach instance metadata service at {}", self.endpoint))?;
        let status = response.status();
        let body = response.text().context("Failed to read instance metadata response")?;
        if !status.is_success() {
            bail!("Instance metadata {path} returned HTTP {}", status.as_u16());
        }
        Ok(body)
    }
}
