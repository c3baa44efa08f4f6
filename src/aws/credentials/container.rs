//! Container credentials endpoint (ECS tasks, CodeBuild builds).

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use super::{parse_session_credentials, Credentials};

pub const RELATIVE_URI_ENV: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
pub const FULL_URI_ENV: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
pub const AUTH_TOKEN_ENV: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";
pub const AUTH_TOKEN_FILE_ENV: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE";

const ECS_CREDENTIALS_HOST: &str = "http://169.254.170.2";
const CONTAINER_HOSTS: [&str; 3] = ["169.254.170.2", "169.254.170.23", "fd00:ec2::23"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthToken {
    Value(String),
    /// Re-read on every fetch; the agent rotates it.
    File(PathBuf),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ContainerSource {
    uri: Url,
    token: Option<AuthToken>,
}

impl fmt::Debug for ContainerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match &self.token {
            None => "none",
            Some(AuthToken::Value(_)) => "** redacted **",
            Some(AuthToken::File(_)) => "file",
        };
        f.debug_struct("ContainerSource")
            .field("uri", &self.uri.as_str())
            .field("token", &token)
            .finish()
    }
}

impl ContainerSource {
    /// `None` when neither URI variable is set. The relative URI wins.
    pub fn from_env(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let uri = if let Some(relative) = lookup(RELATIVE_URI_ENV) {
            Url::parse(&format!("{ECS_CREDENTIALS_HOST}{relative}"))
                .with_context(|| format!("Invalid {RELATIVE_URI_ENV} '{relative}'"))?
        } else if let Some(full) = lookup(FULL_URI_ENV) {
            let uri = Url::parse(&full).with_context(|| format!("Invalid {FULL_URI_ENV} '{full}'"))?;
            if !is_allowed_full_uri(&uri) {
                bail!("{FULL_URI_ENV} must use https or a loopback or container metadata host, got '{full}'");
            }
            uri
        } else {
            return Ok(None);
        };

        let token = lookup(AUTH_TOKEN_FILE_ENV)
            .map(|path| AuthToken::File(PathBuf::from(path)))
            .or_else(|| lookup(AUTH_TOKEN_ENV).map(AuthToken::Value));

        Ok(Some(Self { uri, token }))
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn fetch(&self, client: &Client) -> Result<Credentials> {
        let mut request = client.get(self.uri.clone());
        if let Some(token) = self.authorization()? {
            request = request.header("authorization", token);
        }

        let response = request
            .send()
            .with_context(|| format!("Failed to reach container credentials endpoint {}", self.uri))?;
        let status = response.status();
        let body = response
            .text()
            .context("Failed to read container credentials response")?;

        if !status.is_success() {
            bail!(
                "Container credentials endpoint returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            );
        }
        parse_session_credentials(&body, "container credentials endpoint")
    }

    fn authorization(&self) -> Result<Option<String>> {
        match &self.token {
            None => Ok(None),
            Some(AuthToken::Value(token)) => Ok(Some(token.clone())),
            Some(AuthToken::File(path)) => {
                let token = fs::read_to_string(path).with_context(|| {
                    format!("Failed to read container authorization token: {}", path.display())
                })?;
                Ok(Some(token.trim().to_string()))
            }
        }
    }
}

fn is_allowed_full_uri(uri: &Url) -> bool {
    if uri.scheme() == "https" {
        return true;
    }
    let Some(host) = uri.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || CONTAINER_HOSTS.contains(&ip.to_string().as_str()),
        Err(_) => false,
    }
}
