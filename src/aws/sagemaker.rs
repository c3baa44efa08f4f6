//! SageMaker control plane (AWS JSON 1.1 protocol).

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::http::SignedTransport;
use crate::error::ServiceError;
use crate::platform::{
    ControlPlane, EndpointDescription, ListModelPackagesQuery, ModelPackageSummary,
};

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "SageMaker";
const SORT_BY_CREATION_TIME: &str = "CreationTime";
const SORT_DESCENDING: &str = "Descending";

pub struct SageMakerClient {
    transport: SignedTransport,
    endpoint: Url,
}

impl SageMakerClient {
    pub(crate) fn new(transport: SignedTransport, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        operation: &'static str,
        input: &I,
    ) -> Result<O, ServiceError> {
        let body = serde_json::to_vec(input)?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let headers = [
            ("content-type", JSON_CONTENT_TYPE),
            ("x-amz-target", target.as_str()),
        ];

        let response = self
            .transport
            .post(operation, &self.endpoint, &headers, body)?;
        debug!(operation, status = response.status.as_u16(), "control plane call succeeded");

        decode(operation, &response.body)
    }
}

pub(crate) fn decode<O: DeserializeOwned>(
    operation: &'static str,
    body: &[u8],
) -> Result<O, ServiceError> {
    serde_json::from_slice(body).map_err(|e| ServiceError::malformed(operation, e.to_string()))
}

impl ControlPlane for SageMakerClient {
    fn list_model_packages(
        &self,
        query: &ListModelPackagesQuery,
    ) -> Result<Vec<ModelPackageSummary>, ServiceError> {
        let input = ListModelPackagesInput::from(query);
        let output: ListModelPackagesOutput = self.call("ListModelPackages", &input)?;

        if output.next_token.is_some() {
            debug!(group = %query.group_name, "more model packages available beyond first page");
        }

        Ok(output
            .model_package_summary_list
            .into_iter()
            .map(ModelPackageSummary::from)
            .collect())
    }

    fn describe_endpoint(&self, endpoint_name: &str) -> Result<EndpointDescription, ServiceError> {
        let input = DescribeEndpointInput { endpoint_name };
        let output: DescribeEndpointOutput = self.call("DescribeEndpoint", &input)?;
        Ok(output.into())
    }
}

// Wire shapes

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListModelPackagesInput<'a> {
    model_package_group_name: &'a str,
    sort_by: &'static str,
    sort_order: &'static str,
    max_results: u32,
}

impl<'a> From<&'a ListModelPackagesQuery> for ListModelPackagesInput<'a> {
    fn from(query: &'a ListModelPackagesQuery) -> Self {
        Self {
            model_package_group_name: &query.group_name,
            sort_by: SORT_BY_CREATION_TIME,
            sort_order: SORT_DESCENDING,
            max_results: query.max_results,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListModelPackagesOutput {
    #[serde(default)]
    model_package_summary_list: Vec<ModelPackageSummaryShape>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelPackageSummaryShape {
    model_package_arn: String,
    #[serde(deserialize_with = "epoch_seconds")]
    creation_time: DateTime<Utc>,
    model_package_version: Option<u32>,
    model_package_status: Option<String>,
    model_approval_status: Option<String>,
}

impl From<ModelPackageSummaryShape> for ModelPackageSummary {
    fn from(shape: ModelPackageSummaryShape) -> Self {
        Self {
            arn: shape.model_package_arn,
            creation_time: shape.creation_time,
            version: shape.model_package_version,
            status: shape.model_package_status,
            approval_status: shape.model_approval_status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeEndpointInput<'a> {
    endpoint_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeEndpointOutput {
    endpoint_name: String,
    endpoint_arn: Option<String>,
    endpoint_status: String,
    failure_reason: Option<String>,
}

impl From<DescribeEndpointOutput> for EndpointDescription {
    fn from(output: DescribeEndpointOutput) -> Self {
        Self {
            name: output.endpoint_name,
            arn: output.endpoint_arn,
            status: output.endpoint_status,
            failure_reason: output.failure_reason,
        }
    }
}

/// AWS JSON timestamps are fractional epoch seconds.
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() {
        return Err(D::Error::custom(format!("invalid timestamp: {secs}")));
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}")))
}
