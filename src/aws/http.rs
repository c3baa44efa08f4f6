//! Signed HTTP transport shared by the SageMaker clients.
//!
//! Blocking client with the managed SDK's default timeouts, size-limited body
//! reads and decoding of the AWS JSON (and STS XML) error shapes.

use chrono::Utc;
use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::credentials::ProvideCredentials;
use super::sigv4::{sign, SignableRequest, SigningParams};
use crate::error::ServiceError;

pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 60;
/// The blocking client applies this to the wait for response headers and to
/// each body read separately, so it behaves as a read timeout.
pub(crate) const HTTP_READ_TIMEOUT_SECS: u64 = 60;

/// Largest response body accepted (SageMaker real-time payload limit).
pub(crate) const MAX_RESPONSE_SIZE: u64 = 6 * 1024 * 1024;

const USER_AGENT: &str = concat!("mlops-smoke/", env!("CARGO_PKG_VERSION"));

pub(crate) fn create_http_client() -> Result<Client, ServiceError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(HTTP_READ_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {e}")))
}

/// Client for link-local credential endpoints: short timeouts, never proxied.
pub(crate) fn create_metadata_client(timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .no_proxy()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {e}")))
}

/// Successful response, body fully read.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// HTTP client plus the identity it signs with. Credentials are asked for on
/// every call, so a lazy provider is not resolved until the first request.
#[derive(Clone)]
pub(crate) struct SignedTransport {
    client: Client,
    credentials: Arc<dyn ProvideCredentials>,
    region: String,
    service: &'static str,
}

impl SignedTransport {
    pub fn new(
        credentials: Arc<dyn ProvideCredentials>,
        region: impl Into<String>,
        service: &'static str,
    ) -> Result<Self, ServiceError> {
        Ok(Self::with_client(create_http_client()?, credentials, region, service))
    }

    pub fn with_client(
        client: Client,
        credentials: Arc<dyn ProvideCredentials>,
        region: impl Into<String>,
        service: &'static str,
    ) -> Self {
        Self {
            client,
            credentials,
            region: region.into(),
            service,
        }
    }

    /// Sign and POST `body`. `headers` are sent and signed.
    pub fn post(
        &self,
        operation: &'static str,
        url: &Url,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<RawResponse, ServiceError> {
        let credentials = self.credentials.provide_credentials()?;
        let signed = sign(
            &SignableRequest {
                method: "POST",
                url,
                headers,
                body: &body,
            },
            &SigningParams {
                credentials: &credentials,
                region: &self.region,
                service: self.service,
                time: Utc::now(),
            },
        );

        let mut request = self
            .client
            .post(url.clone())
            .header("amz-sdk-invocation-id", uuid::Uuid::new_v4().to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        for (name, value) in signed.to_pairs() {
            request = request.header(name, value);
        }

        debug!(operation, %url, bytes = body.len(), "sending request");
        let started = Instant::now();
        let response = request.body(body).send().map_err(|source| {
            debug!(operation, error = %source, "request failed");
            ServiceError::Transport { operation, source }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = read_with_limit(response, MAX_RESPONSE_SIZE, operation)?;
        debug!(
            operation,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received response"
        );

        if !status.is_success() {
            let err = api_error(operation, status, &headers, &body);
            debug!(operation, error = %err, "service returned an error");
            return Err(err);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Read the body, refusing anything over `max_size` bytes.
pub(crate) fn read_with_limit(
    response: Response,
    max_size: u64,
    operation: &'static str,
) -> Result<Vec<u8>, ServiceError> {
    if let Some(content_length) = response.content_length() {
        if content_length > max_size {
            return Err(ServiceError::malformed(
                operation,
                format!("Content-Length {content_length} bytes exceeds maximum allowed size of {max_size} bytes"),
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut reader = response.take(max_size + 1);
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ServiceError::malformed(operation, format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_size {
        return Err(ServiceError::malformed(
            operation,
            format!("Response exceeds maximum allowed size of {max_size} bytes"),
        ));
    }
    Ok(bytes)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Text of the first `<tag>...</tag>` in `xml`.
pub(crate) fn extract_tag_value<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].trim())
}

/// Build the error for a non-2xx response.
pub(crate) fn api_error(
    operation: &'static str,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> ServiceError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok().or_else(|| {
        let text = std::str::from_utf8(body).ok()?;
        let message = extract_tag_value(text, "Message").map(str::to_string);
        let error_type = extract_tag_value(text, "Code").map(str::to_string);
        (message.is_some() || error_type.is_some()).then_some(ErrorBody {
            error_type,
            message,
        })
    });

    let raw_code = headers
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parsed.as_ref().and_then(|p| p.error_type.clone()));

    let code = raw_code
        .as_deref()
        .map(normalize_error_code)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());

    let message = parsed
        .and_then(|p| p.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    ServiceError::Api {
        operation,
        status: status.as_u16(),
        code,
        message,
    }
}

/// `aws.namespace#ValidationException:http://...` → `ValidationException`.
pub(crate) fn normalize_error_code(raw: &str) -> String {
    let code = raw.rsplit('#').next().unwrap_or(raw);
    let code = code.split(':').next().unwrap_or(code);
    code.trim().to_string()
}
