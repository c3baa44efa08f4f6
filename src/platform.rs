//! Interfaces to the managed ML platform.
//!
//! The checks only see these traits. `crate::aws` provides the SageMaker
//! implementations; tests substitute in-memory fakes.

use chrono::{DateTime, Utc};

use crate::error::ServiceError;

/// Endpoint status that counts as deployed.
pub const IN_SERVICE: &str = "InService";

/// Parameters for listing the packages of one model package group.
/// Packages are always requested newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListModelPackagesQuery {
    pub group_name: String,
    pub max_results: u32,
}

impl ListModelPackagesQuery {
    /// Newest package only.
    pub fn latest(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            max_results: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPackageSummary {
    pub arn: String,
    pub creation_time: DateTime<Utc>,
    pub version: Option<u32>,
    pub status: Option<String>,
    pub approval_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescription {
    pub name: String,
    pub arn: Option<String>,
    pub status: String,
    pub failure_reason: Option<String>,
}

impl EndpointDescription {
    pub fn is_in_service(&self) -> bool {
        self.status == IN_SERVICE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeEndpointRequest {
    pub endpoint_name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub invoked_production_variant: Option<String>,
}

/// Management API: read-only queries against the registry and endpoints.
pub trait ControlPlane {
    fn list_model_packages(
        &self,
        query: &ListModelPackagesQuery,
    ) -> Result<Vec<ModelPackageSummary>, ServiceError>;

    fn describe_endpoint(&self, endpoint_name: &str) -> Result<EndpointDescription, ServiceError>;
}

/// Runtime API: submit a request to a deployed endpoint.
pub trait InferenceRuntime {
    fn invoke_endpoint(
        &self,
        request: &InvokeEndpointRequest,
    ) -> Result<InvocationOutput, ServiceError>;
}
