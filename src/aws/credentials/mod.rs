//! Credential and region resolution.
//!
//! Credentials follow the default provider chain of the AWS SDKs:
//!
//! 1. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (+ `AWS_SESSION_TOKEN`)
//! 2. the selected profile in the shared files: static keys,
//!    `credential_process`, or `role_arn` assumed through STS
//! 3. container credentials (`AWS_CONTAINER_CREDENTIALS_*`, as set by ECS
//!    and CodeBuild)
//! 4. the EC2 instance metadata service (IMDSv2)
//!
//! Environment and files are read when the chain is built. Anything that
//! needs the network waits until the first signed request.

mod container;
mod imds;
mod process;
mod profile_chain;
mod sts;


use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::http::{create_http_client, create_metadata_client};
use super::profile::{profile_path, ProfileFile, ProfileSet, DEFAULT_PROFILE};
use crate::error::ServiceError;

use container::ContainerSource;
use imds::ImdsSource;
use profile_chain::{ProfileCredentials, RoleSource};

pub const STS_URL_ENV: &str = "AWS_ENDPOINT_URL_STS";

const CONTAINER_TIMEOUT: Duration = Duration::from_secs(2);
const IMDS_TIMEOUT: Duration = Duration::from_secs(1);

/// Signing credentials for one run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Source of credentials for [`super::http::SignedTransport`].
pub trait ProvideCredentials: Send + Sync {
    fn provide_credentials(&self) -> Result<Credentials, ServiceError>;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials(&self) -> Result<Credentials, ServiceError> {
        Ok(self.clone())
    }
}

/// Read a variable from the process environment, treating empty as unset.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn resolve_profile_name(explicit: Option<&str>, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| lookup("AWS_PROFILE"))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

pub fn resolve_region(
    explicit: Option<&str>,
    profile: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String> {
    if let Some(region) = explicit.filter(|r| !r.is_empty()) {
        return Ok(region.to_string());
    }
    if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
        return Ok(region);
    }

    if let Some(path) = profile_path(lookup, "AWS_CONFIG_FILE", "config") {
        let config = ProfileFile::load(&path)?;
        if let Some(region) = config.config_value(profile, "region") {
            return Ok(region.to_string());
        }
    }

    bail!("No AWS region configured. Set AWS_REGION or pass --region")
}

/// Everything the provider chain needs, captured from the environment and the
/// shared files.
#[derive(Debug, Clone)]
pub struct CredentialChain {
    profile: String,
    region: String,
    environment: Option<Credentials>,
    profile_credentials: Option<ProfileCredentials>,
    container: Option<ContainerSource>,
    imds: Option<ImdsSource>,
    sts_endpoint: Url,
}

impl CredentialChain {
    pub fn load(
        profile: &str,
        region: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let environment = environment_credentials(lookup);

        // Environment keys win outright; the profile is only consulted
        // without them.
        let profile_credentials = if environment.is_some() {
            None
        } else {
            let profiles = ProfileSet::load(lookup)?;
            if profile != DEFAULT_PROFILE && !profiles.contains(profile) {
                bail!("The config profile ({profile}) could not be found");
            }
            ProfileCredentials::from_profiles(&profiles, profile)?
        };

        let sts_endpoint = super::endpoint_url(None, STS_URL_ENV, lookup, || {
            format!("https://sts.{region}.amazonaws.com")
        })?;

        Ok(Self {
            profile: profile.to_string(),
            region: region.to_string(),
            environment,
            profile_credentials,
            container: ContainerSource::from_env(lookup)?,
            imds: ImdsSource::from_env(lookup),
            sts_endpoint,
        })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Walk the chain and return the first credentials found.
    pub fn resolve(&self) -> Result<Credentials> {
        if let Some(credentials) = &self.environment {
            debug!("using credentials from environment");
            return Ok(credentials.clone());
        }

        if let Some(source) = &self.profile_credentials {
            debug!(profile = %self.profile, "using credentials from shared profile");
            return self.resolve_profile(source);
        }

        if let Some(container) = &self.container {
            debug!(uri = %container.uri(), "using container credentials");
            return container.fetch(&create_metadata_client(CONTAINER_TIMEOUT)?);
        }

        if let Some(imds) = &self.imds {
            match imds.fetch(&create_metadata_client(IMDS_TIMEOUT)?) {
                Ok(credentials) => {
                    debug!(endpoint = imds.endpoint(), "using instance metadata credentials");
                    return Ok(credentials);
                }
                Err(e) => debug!(error = %format!("{e:#}"), "instance metadata credentials unavailable"),
            }
        }

        bail!(
            "Unable to locate AWS credentials for profile '{}'. Set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY, configure the profile in the shared AWS files, or run with a container or instance role",
            self.profile
        )
    }

    fn resolve_profile(&self, source: &ProfileCredentials) -> Result<Credentials> {
        match source {
            ProfileCredentials::Static(credentials) => Ok(credentials.clone()),
            ProfileCredentials::Process(command) => process::run(command),
            ProfileCredentials::AssumeRole(role) => {
                let base = match &role.source {
                    RoleSource::Profile(inner) => self.resolve_profile(inner)?,
                    RoleSource::Environment => self.environment.clone().context(
                        "credential_source is Environment but AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY are not set",
                    )?,
                    RoleSource::EcsContainer => self
                        .container
                        .as_ref()
                        .context("credential_source is EcsContainer but no container credentials URI is set")?
                        .fetch(&create_metadata_client(CONTAINER_TIMEOUT)?)?,
                    RoleSource::Ec2InstanceMetadata => self
                        .imds
                        .as_ref()
                        .context("credential_source is Ec2InstanceMetadata but instance metadata is disabled")?
                        .fetch(&create_metadata_client(IMDS_TIMEOUT)?)?,
                };
                sts::assume_role(create_http_client()?, &self.sts_endpoint, &self.region, base, role)
            }
        }
    }
}

fn environment_credentials(lookup: &dyn Fn(&str) -> Option<String>) -> Option<Credentials> {
    let key = lookup("AWS_ACCESS_KEY_ID")?;
    let secret = lookup("AWS_SECRET_ACCESS_KEY")?;
    Some(Credentials::new(key, secret, lookup("AWS_SESSION_TOKEN")))
}

/// Resolves a [`CredentialChain`] on first use and reuses the result.
#[derive(Debug)]
pub struct LazyCredentials {
    chain: CredentialChain,
    cached: Mutex<Option<Credentials>>,
}

impl LazyCredentials {
    pub fn new(chain: CredentialChain) -> Self {
        Self {
            chain,
            cached: Mutex::new(None),
        }
    }
}

impl ProvideCredentials for LazyCredentials {
    fn provide_credentials(&self) -> Result<Credentials, ServiceError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| ServiceError::Configuration("Credential cache lock poisoned".to_string()))?;
        if let Some(credentials) = cached.as_ref() {
            return Ok(credentials.clone());
        }

        debug!(profile = self.chain.profile(), "resolving credentials");
        let credentials = self.chain.resolve().map_err(super::configuration_error)?;
        *cached = Some(credentials.clone());
        Ok(credentials)
    }
}

/// JSON served by the container and instance metadata endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionCredentialsResponse {
    code: Option<String>,
    message: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    token: Option<String>,
}

pub(crate) fn parse_session_credentials(body: &str, source: &str) -> Result<Credentials> {
    let parsed: SessionCredentialsResponse =
        serde_json::from_str(body).with_context(|| format!("Malformed {source} response"))?;

    if let Some(code) = parsed.code.as_deref().filter(|c| *c != "Success") {
        bail!(
            "{source} returned {code}: {}",
            parsed.message.as_deref().unwrap_or("no message")
        );
    }

    match (parsed.access_key_id, parsed.secret_access_key) {
        (Some(key), Some(secret)) => Ok(Credentials::new(key, secret, parsed.token)),
        _ => bail!("{source} response has no AccessKeyId/SecretAccessKey"),
    }
}
