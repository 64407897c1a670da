// Per-request and process-wide domain types shared across the gateway

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::errors::GatewayError;
use crate::protocol::JolokiaRequest;

/// Privilege tier derived from the cluster access review of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Caller may `update` the pod
    Admin,
    /// Caller may only `get` the pod
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one Jolokia request against the ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RbacDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Outcome of offering an allowed request to the interceptor
///
/// When `intercepted` is true, `response` holds the canned Jolokia response
/// that replaces the upstream call. Otherwise `request` is what gets forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptionResult {
    pub intercepted: bool,
    pub request: JolokiaRequest,
    pub response: Option<Value>,
}

impl InterceptionResult {
    pub fn passthrough(request: JolokiaRequest) -> Self {
        Self {
            intercepted: false,
            request,
            response: None,
        }
    }

    pub fn intercepted(request: JolokiaRequest, response: Value) -> Self {
        Self {
            intercepted: true,
            request,
            response: Some(response),
        }
    }
}

/// Canonical shape for every upstream and authorization outcome
#[derive(Debug, Clone, Default)]
pub struct SimpleResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl SimpleResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Build a response whose body is the serialized JSON value
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// True for 2xx statuses
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Selects the shape of the cluster access review request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Form login: generic `authorization.k8s.io` review carrying the token subject
    Form,
    /// Platform-native `authorization.openshift.io` review
    #[default]
    Platform,
}

impl AuthMode {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("form") => AuthMode::Form,
            _ => AuthMode::Platform,
        }
    }
}

/// Scheme of the pod's Jolokia endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("Unsupported protocol: {}", other)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS material loaded once at startup and shared read-only by every outbound call
#[derive(Debug, Clone, Default)]
pub struct SslOptions {
    /// CA bundle trusted for cluster API calls
    pub cert_ca: Option<Vec<u8>>,
    /// mTLS client key presented to https pods
    pub proxy_key: Option<Vec<u8>>,
    /// mTLS client certificate presented to https pods
    pub proxy_cert: Option<Vec<u8>>,
}

impl SslOptions {
    /// Read whichever PEM files are configured
    pub fn load(
        cert_ca: Option<&Path>,
        proxy_key: Option<&Path>,
        proxy_cert: Option<&Path>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            cert_ca: cert_ca.map(|p| Self::read(p, "SSL certificate authority")).transpose()?,
            proxy_key: proxy_key.map(|p| Self::read(p, "SSL proxy certificate key")).transpose()?,
            proxy_cert: proxy_cert
                .map(|p| Self::read(p, "SSL proxy certificate"))
                .transpose()?,
        })
    }

    fn read(path: &Path, description: &str) -> Result<Vec<u8>, GatewayError> {
        std::fs::read(path).map_err(|e| {
            GatewayError::Configuration(format!(
                "The {} assigned at {:?} could not be read: {}",
                description, path, e
            ))
        })
    }
}

/// Everything one inbound management request needs on its way upstream
///
/// Built once from the routing URL match and never shared between requests.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub method: Method,
    /// Inbound headers minus the forwarding denylist
    pub request_headers: HeaderMap,
    /// Raw inbound body, forwarded untouched for single and passthrough requests
    pub body: Bytes,
    pub ssl: Arc<SslOptions>,
    pub namespace: String,
    pub protocol: Protocol,
    pub pod: String,
    pub port: u16,
    /// Jolokia path (and query) below the pod segment, e.g. `jolokia/read/...`
    pub path: String,
}
