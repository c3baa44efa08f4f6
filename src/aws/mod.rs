//! SageMaker control-plane and runtime clients.
//!
//! Hand-rolled over blocking reqwest with SigV4 signing; only the three
//! operations the checks need are implemented.

pub mod credentials;
pub(crate) mod http;
pub mod profile;
pub mod runtime;
pub mod sagemaker;
pub mod sigv4;

#[cfg(test)]
pub(crate) mod test_server;

use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

use crate::config::AwsOptions;
use crate::error::ServiceError;

use self::credentials::{
    process_env, resolve_profile_name, resolve_region, CredentialChain, LazyCredentials,
    ProvideCredentials,
};
use self::http::SignedTransport;
use self::runtime::SageMakerRuntimeClient;
use self::sagemaker::SageMakerClient;

/// SigV4 signing name for both SageMaker APIs.
pub const SIGNING_NAME: &str = "sagemaker";

pub const CONTROL_PLANE_URL_ENV: &str = "AWS_ENDPOINT_URL_SAGEMAKER";
pub const RUNTIME_URL_ENV: &str = "AWS_ENDPOINT_URL_SAGEMAKER_RUNTIME";
pub const GLOBAL_URL_ENV: &str = "AWS_ENDPOINT_URL";

/// Everything needed to build the two clients. Credentials are described
/// here but only fetched when the first request is signed.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub region: String,
    pub credentials: CredentialChain,
    pub control_plane_url: Url,
    pub runtime_url: Url,
}

impl ClientConfig {
    /// Resolve from the options and the process environment.
    pub fn resolve(options: &AwsOptions) -> Result<Self, ServiceError> {
        Self::resolve_with(options, &process_env)
    }

    pub fn resolve_with(
        options: &AwsOptions,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ServiceError> {
        let profile = resolve_profile_name(options.profile.as_deref(), lookup);
        let region = resolve_region(options.region.as_deref(), &profile, lookup)
            .map_err(configuration_error)?;
        let credentials =
            CredentialChain::load(&profile, &region, lookup).map_err(configuration_error)?;

        let control_plane_url = endpoint_url(
            options.control_plane_url.as_deref(),
            CONTROL_PLANE_URL_ENV,
            lookup,
            || format!("https://api.sagemaker.{region}.amazonaws.com"),
        )?;
        let runtime_url = endpoint_url(
            options.runtime_url.as_deref(),
            RUNTIME_URL_ENV,
            lookup,
            || format!("https://runtime.sagemaker.{region}.amazonaws.com"),
        )?;

        debug!(%profile, %region, %control_plane_url, %runtime_url, "resolved AWS client configuration");

        Ok(Self {
            region,
            credentials,
            control_plane_url,
            runtime_url,
        })
    }

    /// Build the control-plane and runtime clients over one HTTP pool and one
    /// credentials cache.
    pub fn build_clients(&self) -> Result<(SageMakerClient, SageMakerRuntimeClient), ServiceError> {
        let credentials: Arc<dyn ProvideCredentials> =
            Arc::new(LazyCredentials::new(self.credentials.clone()));
        let transport = SignedTransport::new(credentials, self.region.clone(), SIGNING_NAME)?;
        Ok((
            SageMakerClient::new(transport.clone(), self.control_plane_url.clone()),
            SageMakerRuntimeClient::new(transport, self.runtime_url.clone()),
        ))
    }
}

pub(crate) fn configuration_error(err: anyhow::Error) -> ServiceError {
    ServiceError::Configuration(format!("{err:#}"))
}

pub(crate) fn endpoint_url(
    explicit: Option<&str>,
    service_env: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
    default: impl FnOnce() -> String,
) -> Result<Url, ServiceError> {
    let raw = explicit
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .or_else(|| lookup(service_env))
        .or_else(|| lookup(GLOBAL_URL_ENV))
        .unwrap_or_else(default);

    Url::parse(&raw)
        .map_err(|e| ServiceError::Configuration(format!("Invalid endpoint URL '{raw}': {e}")))
}
