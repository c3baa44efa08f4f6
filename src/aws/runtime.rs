//! SageMaker runtime: endpoint invocation.

use reqwest::Url;
use tracing::debug;

use super::http::SignedTransport;
use crate::error::ServiceError;
use crate::platform::{InferenceRuntime, InvocationOutput, InvokeEndpointRequest};

const OPERATION: &str = "InvokeEndpoint";
const INVOKED_VARIANT_HEADER: &str = "x-amzn-invoked-production-variant";

pub struct SageMakerRuntimeClient {
    transport: SignedTransport,
    endpoint: Url,
}

impl SageMakerRuntimeClient {
    pub(crate) fn new(transport: SignedTransport, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint,
        }
    }
}

/// `<base>/endpoints/<name>/invocations`, with the name percent-encoded.
pub(crate) fn invocation_url(base: &Url, endpoint_name: &str) -> Result<Url, ServiceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ServiceError::Configuration(format!("Invalid runtime endpoint URL: {base}")))?
        .pop_if_empty()
        .extend(["endpoints", endpoint_name, "invocations"]);
    Ok(url)
}

impl InferenceRuntime for SageMakerRuntimeClient {
    fn invoke_endpoint(
        &self,
        request: &InvokeEndpointRequest,
    ) -> Result<InvocationOutput, ServiceError> {
        let url = invocation_url(&self.endpoint, &request.endpoint_name)?;
        let headers = [("content-type", request.content_type.as_str())];

        let response = self
            .transport
            .post(OPERATION, &url, &headers, request.body.clone())?;
        debug!(
            endpoint = %request.endpoint_name,
            status = response.status.as_u16(),
            "endpoint invoked"
        );

        Ok(InvocationOutput {
            content_type: response.header("content-type"),
            invoked_production_variant: response.header(INVOKED_VARIANT_HEADER),
            body: response.body,
        })
    }
}
