//! Error types for the smoke test.
//!
//! A run can only fail in two ways: an expectation about the deployment was
//! violated, or one of the managed-service clients failed. Everything the
//! clients can report is folded into [`ServiceError`] and surfaces at the top
//! level as [`CheckError::ExternalService`].

use std::string::FromUtf8Error;

/// Process exit status for any failed run.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Failure reported by the control-plane or data-plane client.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: {code} (HTTP {status}): {message}")]
    Api {
        operation: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("{operation}: malformed response: {detail}")]
    MalformedResponse {
        operation: &'static str,
        detail: String,
    },

    #[error("{0}")]
    Configuration(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

impl ServiceError {
    pub(crate) fn malformed(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            detail: detail.into(),
        }
    }
}

/// Outcome of a failed check.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The deployment is reachable but not in the expected state.
    #[error("{0}")]
    Verification(String),

    /// A client call failed before the expectation could be evaluated.
    #[error(transparent)]
    ExternalService(#[from] ServiceError),
}

impl CheckError {
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }

    /// Line printed to stdout when the run stops on this error.
    pub fn report_line(&self) -> String {
        match self {
            CheckError::Verification(message) => format!("❌ Test failed: {message}"),
            CheckError::ExternalService(err) => format!("❌ Unexpected error: {err}"),
        }
    }

    pub fn exit_code(&self) -> i32 {
        FAILURE_EXIT_CODE
    }
}
