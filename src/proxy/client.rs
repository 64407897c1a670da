// HTTP client for the cluster API and the pods' Jolokia agents

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use reqwest::{Certificate, Client, Identity};
use serde_json::{json, Value};
use tracing::{debug, error, trace};

use crate::api::JolokiaUpstream;
use crate::core::errors::GatewayError;
use crate::core::models::{AgentInfo, Protocol, SimpleResponse, SslOptions};
use crate::utils::join_paths;

/// Upstream response headers not relayed: hop-by-hop plus the framing of a
/// body that is re-encoded here
const NON_RELAYED_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "content-encoding",
];

/// Client for cluster API calls: trusts the configured CA, no connection reuse
///
/// Certificate validation is not enforced, matching the in-cluster service
/// certificates the gateway talks to.
pub fn cluster_client(ssl: &SslOptions) -> Result<Client, GatewayError> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0);

    if let Some(ca) = &ssl.cert_ca {
        let certificate = Certificate::from_pem(ca)
            .map_err(|e| GatewayError::Unclassified(format!("Invalid SSL certificate authority: {}", e)))?;
        builder = builder.add_root_certificate(certificate);
    }

    builder
        .build()
        .map_err(|e| GatewayError::Unclassified(format!("Failed to create HTTP client: {}", e)))
}

/// Client for a pod's agent: presents the proxy identity to https pods, no connection reuse
pub fn agent_client(ssl: &SslOptions, protocol: Protocol) -> Result<Client, GatewayError> {
    let mut builder = Client::builder().pool_max_idle_per_host(0);

    if protocol == Protocol::Https {
        builder = builder.danger_accept_invalid_certs(true);
        if let (Some(cert), Some(key)) = (&ssl.proxy_cert, &ssl.proxy_key) {
            let identity = Identity::from_pkcs8_pem(cert, key)
                .map_err(|e| GatewayError::Unclassified(format!("Invalid SSL proxy certificate: {}", e)))?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| GatewayError::Unclassified(format!("Failed to create HTTP client: {}", e)))
}

/// Copy upstream headers minus hop-by-hop ones
pub fn relay_headers(headers: &HeaderMap) -> HeaderMap {
    let mut relayed = headers.clone();
    for name in NON_RELAYED_HEADERS {
        relayed.remove(*name);
    }
    relayed
}

/// Forwarded request headers plus a JSON content type
pub fn json_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Decode a cluster API body that may itself be a JSON-encoded string
pub fn parse_cluster_json(text: &str) -> Result<Value, GatewayError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::String(inner) => Ok(serde_json::from_str(&inner)?),
        other => Ok(other),
    }
}

fn status_text(status: reqwest::StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Non-ok upstream answer, body appended when there is one
async fn upstream_failure(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let reason = status_text(status);
    GatewayError::Upstream {
        status: Some(status.as_u16()),
        message: if body.is_empty() {
            reason
        } else {
            format!("{}---{}", reason, body)
        },
    }
}

/// Upstream client for pod lookup, MBean catalog and agent calls
///
/// Every call builds its own client, so no connection outlives its request.
pub struct JolokiaClient {
    cluster_address: String,
}

impl JolokiaClient {
    pub fn new(cluster_address: impl Into<String>) -> Self {
        Self {
            cluster_address: cluster_address.into(),
        }
    }

    fn agent_uri(pod_ip: &str, agent: &AgentInfo) -> String {
        let base = format!("{}://{}:{}", agent.protocol, pod_ip, agent.port);
        join_paths(&[base.as_str(), agent.path.as_str()])
    }
}

#[async_trait]
impl JolokiaUpstream for JolokiaClient {
    async fn pod_ip(&self, agent: &AgentInfo) -> Result<String, GatewayError> {
        let uri = join_paths(&[
            self.cluster_address.as_str(),
            "api",
            "v1",
            "namespaces",
            agent.namespace.as_str(),
            "pods",
            agent.pod.as_str(),
        ]);
        trace!(uri = %uri, "Getting pod IP");

        let response = cluster_client(&agent.ssl)?
            .get(&uri)
            .headers(agent.request_headers.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), pod = %agent.pod, "Pod lookup failed");
            return Err(upstream_failure(response).await);
        }

        let pod = parse_cluster_json(&response.text().await?)?;
        pod.pointer("/status/podIP")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::Unclassified(format!("Pod {}/{} has no IP address", agent.namespace, agent.pod))
            })
    }

    async fn list_mbeans(&self, pod_ip: &str, agent: &AgentInfo) -> Result<Value, GatewayError> {
        let uri = Self::agent_uri(pod_ip, agent);
        trace!(uri = %uri, "Listing MBeans");

        let response = agent_client(&agent.ssl, agent.protocol)?
            .post(&uri)
            .headers(json_request_headers(&agent.request_headers))
            .body(json!({ "type": "list" }).to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "MBean listing failed");
            return Err(upstream_failure(response).await);
        }

        let mut data: Value = serde_json::from_str(&response.text().await?)?;
        Ok(data.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }

    async fn call_agent(&self, pod_ip: &str, agent: &AgentInfo, body: Option<Bytes>) -> Result<SimpleResponse, GatewayError> {
        let uri = Self::agent_uri(pod_ip, agent);
        debug!(uri = %uri, method = %agent.method, "Calling Jolokia agent");

        let mut request = agent_client(&agent.ssl, agent.protocol)?.request(agent.method.clone(), &uri);
        if agent.method == Method::POST {
            request = request
                .headers(json_request_headers(&agent.request_headers))
                .body(body.unwrap_or_default());
        } else {
            request = request.headers(agent.request_headers.clone());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!(status = status.as_u16(), "Jolokia agent call failed");
            return Err(GatewayError::rejected_reason(
                status.as_u16(),
                format!("calljolokiaAgent was rejected: {}", status_text(status)),
            ));
        }

        let headers = relay_headers(response.headers());
        let text = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read Jolokia agent response");
            GatewayError::Unclassified(format!("Failed to parse data from response: {}", e))
        })?;

        Ok(SimpleResponse::new(status.as_u16(), text).with_headers(headers))
    }
}
