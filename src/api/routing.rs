// Management URL matching and per-request agent context

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::core::models::{AgentInfo, Protocol, SslOptions};

/// `/management/namespaces/<ns>/pods/<http|https>:<pod>:<port>/<path>`
///
/// Captures are greedy: a pod segment holding extra colons is split at the
/// last `:<digits>/`.
static MANAGEMENT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/management/namespaces/(.+)/pods/(http|https):(.+):(\d+)/(.*)$")
        .expect("management URL pattern is a valid regex")
});

/// Inbound headers never copied onto upstream requests
pub const EXCLUDED_HEADERS: &[&str] = &[
    "host",
    "content-type",
    "content-length",
    "content-security-policy",
    "connection",
    "transfer-encoding",
];

/// Target pod address parsed from a management URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRoute {
    pub namespace: String,
    pub protocol: Protocol,
    pub pod: String,
    pub port: u16,
    /// Jolokia path below the pod segment, query string included
    pub path: String,
}

impl AgentRoute {
    /// Match a request target (path and query)
    pub fn parse(target: &str) -> Option<Self> {
        let captures = MANAGEMENT_URL.captures(target)?;
        Some(Self {
            namespace: captures.get(1)?.as_str().to_string(),
            protocol: captures.get(2)?.as_str().parse().ok()?,
            pod: captures.get(3)?.as_str().to_string(),
            port: captures.get(4)?.as_str().parse().ok()?,
            path: captures.get(5)?.as_str().to_string(),
        })
    }

    /// Bind the route to the inbound request
    pub fn into_agent_info(self, method: Method, headers: &HeaderMap, body: Bytes, ssl: Arc<SslOptions>) -> AgentInfo {
        AgentInfo {
            method,
            request_headers: forwarded_headers(headers),
            body,
            ssl,
            namespace: self.namespace,
            protocol: self.protocol,
            pod: self.pod,
            port: self.port,
            path: self.path,
        }
    }
}

/// Inbound headers minus [`EXCLUDED_HEADERS`]
pub fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in EXCLUDED_HEADERS {
        forwarded.remove(*name);
    }
    forwarded
}
