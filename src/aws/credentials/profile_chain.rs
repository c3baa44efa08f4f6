//! Credentials described by a shared-file profile.

use anyhow::{bail, Context, Result};

use super::Credentials;
use crate::aws::profile::ProfileSet;

/// What a profile says about where its credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCredentials {
    Static(Credentials),
    /// `credential_process` command line.
    Process(String),
    AssumeRole(AssumeRole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRole {
    pub role_arn: String,
    pub session_name: Option<String>,
    pub external_id: Option<String>,
    pub duration_seconds: Option<u32>,
    pub source: RoleSource,
}

/// Credentials used to call `AssumeRole`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSource {
    Profile(Box<ProfileCredentials>),
    Environment,
    Ec2InstanceMetadata,
    EcsContainer,
}

impl ProfileCredentials {
    /// `None` when the profile has no credential settings at all.
    pub fn from_profiles(profiles: &ProfileSet, profile: &str) -> Result<Option<Self>> {
        let mut visited = Vec::new();
        resolve(profiles, profile, &mut visited)
    }
}

fn resolve(
    profiles: &ProfileSet,
    name: &str,
    visited: &mut Vec<String>,
) -> Result<Option<ProfileCredentials>> {
    if visited.iter().any(|v| v == name) {
        visited.push(name.to_string());
        bail!("Profile chain contains a cycle: {}", visited.join(" -> "));
    }
    visited.push(name.to_string());

    // role_arn takes precedence over static keys in the same profile.
    if let Some(role_arn) = profiles.value(name, "role_arn") {
        let source = role_source(profiles, name, visited)?;
        let duration_seconds = profiles
            .value(name, "duration_seconds")
            .map(|v| {
                v.parse::<u32>()
                    .with_context(|| format!("Invalid duration_seconds '{v}' in profile '{name}'"))
            })
            .transpose()?;

        return Ok(Some(ProfileCredentials::AssumeRole(AssumeRole {
            role_arn: role_arn.to_string(),
            session_name: profiles.value(name, "role_session_name").map(str::to_string),
            external_id: profiles.value(name, "external_id").map(str::to_string),
            duration_seconds,
            source,
        })));
    }

    if let Some(credentials) = static_credentials(profiles, name) {
        return Ok(Some(ProfileCredentials::Static(credentials)));
    }

    if let Some(command) = profiles.value(name, "credential_process") {
        return Ok(Some(ProfileCredentials::Process(command.to_string())));
    }

    Ok(None)
}

fn role_source(profiles: &ProfileSet, name: &str, visited: &mut Vec<String>) -> Result<RoleSource> {
    match (
        profiles.value(name, "source_profile"),
        profiles.value(name, "credential_source"),
    ) {
        (Some(_), Some(_)) => {
            bail!("Profile '{name}' sets both source_profile and credential_source")
        }
        (Some(source), None) if source == name => {
            let credentials = static_credentials(profiles, name).with_context(|| {
                format!("Profile '{name}' is its own source_profile but has no static keys")
            })?;
            Ok(RoleSource::Profile(Box::new(ProfileCredentials::Static(credentials))))
        }
        (Some(source), None) => {
            if !profiles.contains(source) {
                bail!("source_profile '{source}' referenced by profile '{name}' does not exist");
            }
            let inner = resolve(profiles, source, visited)?
                .with_context(|| format!("source_profile '{source}' has no credentials"))?;
            Ok(RoleSource::Profile(Box::new(inner)))
        }
        (None, Some("Environment")) => Ok(RoleSource::Environment),
        (None, Some("Ec2InstanceMetadata")) => Ok(RoleSource::Ec2InstanceMetadata),
        (None, Some("EcsContainer")) => Ok(RoleSource::EcsContainer),
        (None, Some(other)) => {
            bail!("Unsupported credential_source '{other}' in profile '{name}'")
        }
        (None, None) => bail!(
            "Profile '{name}' sets role_arn but neither source_profile nor credential_source"
        ),
    }
}

fn static_credentials(profiles: &ProfileSet, name: &str) -> Option<Credentials> {
    let key = profiles.value(name, "aws_access_key_id")?;
    let secret = profiles.value(name, "aws_secret_access_key")?;
    Some(Credentials::new(
        key,
        secret,
        profiles.value(name, "aws_session_token").map(str::to_string),
    ))
}
