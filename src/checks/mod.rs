//! The three deployment checks and the sequence that runs them.
//!
//! Order is fixed: registration, deployment, inference. The first failure
//! ends the run and later checks are never attempted.

mod report;


pub use report::{ConsoleReporter, Reporter};

use tracing::info;

use crate::config::Targets;
use crate::error::{CheckError, ServiceError};
use crate::payload::{StoreTransaction, CONTENT_TYPE_JSON};
use crate::platform::{
    ControlPlane, InferenceRuntime, InvokeEndpointRequest, ListModelPackagesQuery,
};

pub const NO_MODELS_MESSAGE: &str = "No models found in package group!";

/// What a fully passing run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub model_package_arn: String,
    pub endpoint_name: String,
    pub inference_response: String,
}

pub struct VerificationRunner<'a, C, R, W> {
    control: &'a C,
    runtime: &'a R,
    targets: &'a Targets,
    reporter: W,
}

impl<'a, C, R, W> VerificationRunner<'a, C, R, W>
where
    C: ControlPlane,
    R: InferenceRuntime,
    W: Reporter,
{
    pub fn new(control: &'a C, runtime: &'a R, targets: &'a Targets, reporter: W) -> Self {
        Self {
            control,
            runtime,
            targets,
            reporter,
        }
    }

    /// Run all checks, stopping at the first failure.
    pub fn run(&mut self) -> Result<RunSummary, CheckError> {
        self.reporter.header("Running Model Registration Test...");
        let model_package_arn = self.check_model_registration()?;

        self.reporter.blank();
        self.reporter.header("Running Deployment Test...");
        self.check_deployment()?;

        self.reporter.blank();
        self.reporter.header("Running Inference Test...");
        let inference_response = self.check_inference()?;

        self.reporter.blank();
        self.reporter.success("🎉 All tests passed successfully!");

        Ok(RunSummary {
            model_package_arn,
            endpoint_name: self.targets.endpoint_name.clone(),
            inference_response,
        })
    }

    /// Confirm the group has at least one registered package and return the
    /// ARN of the newest one.
    pub fn check_model_registration(&mut self) -> Result<String, CheckError> {
        let query = ListModelPackagesQuery::latest(&self.targets.model_package_group_name);
        let packages = self.control.list_model_packages(&query)?;

        // Ordering is requested from the service; re-select so a misordered
        // page still yields the newest entry. Ties keep the first one.
        let latest = packages
            .iter()
            .reduce(|newest, p| {
                if p.creation_time > newest.creation_time {
                    p
                } else {
                    newest
                }
            })
            .ok_or_else(|| CheckError::verification(NO_MODELS_MESSAGE))?;

        info!(
            group = %self.targets.model_package_group_name,
            arn = %latest.arn,
            created = %latest.creation_time,
            "model package found"
        );
        self.reporter
            .line(&format!("✅ Model registered: {}", latest.arn));

        Ok(latest.arn.clone())
    }

    /// Confirm the endpoint reports `InService`.
    pub fn check_deployment(&mut self) -> Result<bool, CheckError> {
        let targets = self.targets;
        let endpoint_name = &targets.endpoint_name;
        let endpoint = self.control.describe_endpoint(endpoint_name)?;

        if !endpoint.is_in_service() {
            if let Some(reason) = &endpoint.failure_reason {
                info!(endpoint = %endpoint_name, status = %endpoint.status, %reason, "endpoint not ready");
            }
            return Err(CheckError::verification(format!(
                "Endpoint {endpoint_name} not ready. Current status: {}",
                endpoint.status
            )));
        }

        info!(endpoint = %endpoint_name, "endpoint in service");
        self.reporter.line(&format!(
            "✅ Endpoint {endpoint_name} is deployed and InService."
        ));

        Ok(true)
    }

    /// Send the sample transaction and return the response body as text.
    pub fn check_inference(&mut self) -> Result<String, CheckError> {
        let body = StoreTransaction::sample()
            .to_json()
            .map_err(ServiceError::from)?;

        let request = InvokeEndpointRequest {
            endpoint_name: self.targets.endpoint_name.clone(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            body,
        };
        let output = self.runtime.invoke_endpoint(&request)?;

        info!(
            endpoint = %request.endpoint_name,
            variant = output.invoked_production_variant.as_deref().unwrap_or("-"),
            content_type = output.content_type.as_deref().unwrap_or("-"),
            "inference served"
        );

        let result = String::from_utf8(output.body).map_err(ServiceError::from)?;
        self.reporter
            .line(&format!("✅ Inference response: {result}"));

        Ok(result)
    }
}
