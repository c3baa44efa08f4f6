//! Run configuration.
//!
//! The binary resolves these values once through clap (flags first, then
//! environment, then the defaults below) and never changes them afterwards.

use crate::error::ServiceError;

/// Model package group checked when `MODEL_PACKAGE_GROUP_NAME` is unset.
pub const DEFAULT_MODEL_PACKAGE_GROUP_NAME: &str = "anjali-mlops-demo";

/// Endpoint checked when `ENDPOINT_NAME` is unset.
pub const DEFAULT_ENDPOINT_NAME: &str = "anjali-mlops-demo-staging";

pub const MODEL_PACKAGE_GROUP_NAME_ENV: &str = "MODEL_PACKAGE_GROUP_NAME";
pub const ENDPOINT_NAME_ENV: &str = "ENDPOINT_NAME";

/// The deployment under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    pub model_package_group_name: String,
    pub endpoint_name: String,
}

impl Targets {
    pub fn new(model_package_group_name: impl Into<String>, endpoint_name: impl Into<String>) -> Self {
        Self {
            model_package_group_name: model_package_group_name.into(),
            endpoint_name: endpoint_name.into(),
        }
    }

    /// Both identifiers must be non-empty before any call is made.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.model_package_group_name.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "Model package group name cannot be empty".to_string(),
            ));
        }
        if self.endpoint_name.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "Endpoint name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Targets {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PACKAGE_GROUP_NAME, DEFAULT_ENDPOINT_NAME)
    }
}

/// Overrides for how the AWS clients are built. `None` means "use the
/// standard AWS environment and profile files".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsOptions {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub control_plane_url: Option<String>,
    pub runtime_url: Option<String>,
}
