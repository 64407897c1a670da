// Gateway error taxonomy and the central failure normalizer

use serde_json::{json, Value};
use thiserror::Error;

use crate::core::models::SimpleResponse;

/// Every failure a request can hit on its way through the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed Jolokia GET path or POST body (HTTP 502)
    #[error("{0}")]
    Protocol(String),

    /// Explicit authorization or policy denial, relayed with its own status and body
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: Value },

    /// Non-2xx answer or transport failure from the cluster API or the pod (HTTP 502 if no status)
    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    /// Anything else (HTTP 502)
    #[error("{0}")]
    Unclassified(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Rejection whose body carries a `reason` field
    pub fn rejected_reason(status: u16, reason: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status,
            body: json!({ "reason": reason.into() }),
        }
    }

    /// Rejection whose body carries a `message` field
    pub fn rejected_message(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Protocol(_) => 502,
            GatewayError::Rejected { status, .. } => *status,
            GatewayError::Upstream { status, .. } => status.unwrap_or(502),
            GatewayError::Unclassified(_) => 502,
            GatewayError::Configuration(_) => 502,
        }
    }

    /// Convert any failure into the response that will be sent to the caller
    pub fn into_simple_response(self) -> SimpleResponse {
        let status = self.status_code();
        match self {
            GatewayError::Protocol(message) => SimpleResponse::json(status, &json!({ "error": message })),
            GatewayError::Rejected { body, .. } => SimpleResponse::json(status, &body),
            GatewayError::Upstream { message, .. } => {
                SimpleResponse::json(status, &json!({ "reason": message }))
            }
            GatewayError::Unclassified(message) | GatewayError::Configuration(message) => {
                SimpleResponse::json(status, &json!({ "error": message }))
            }
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Unclassified(e.to_string())
    }
}
