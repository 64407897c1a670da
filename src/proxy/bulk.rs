// Policy evaluation and ordered reassembly for single and bulk Jolokia requests

use bytes::Bytes;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::api::{JolokiaUpstream, PolicyEngine};
use crate::core::errors::GatewayError;
use crate::core::models::{AgentInfo, InterceptionResult, RbacDecision, Role, SimpleResponse};
use crate::protocol::{translate, JolokiaPayload, JolokiaRequest};

/// Status used for an intercepted request whose canned response carries none
const DEFAULT_INTERCEPT_STATUS: u16 = 502;

/// Evaluate and forward one inbound request for a caller holding `role`
///
/// The pod IP and, when needed, the MBean catalog are fetched once per
/// inbound request whatever the batch size.
pub async fn handle_request_with_role(
    policy: &dyn PolicyEngine,
    upstream: &dyn JolokiaUpstream,
    role: Role,
    agent: &AgentInfo,
) -> Result<SimpleResponse, GatewayError> {
    match translate(&agent.method, &agent.path, &agent.body)? {
        JolokiaPayload::Single(request) => handle_single(policy, upstream, role, agent, request).await,
        JolokiaPayload::Bulk(requests) => handle_bulk(policy, upstream, role, agent, requests).await,
    }
}

async fn fetch_context(
    upstream: &dyn JolokiaUpstream,
    agent: &AgentInfo,
    catalog_required: bool,
) -> Result<(String, Value), GatewayError> {
    let pod_ip = upstream.pod_ip(agent).await?;
    let catalog = if catalog_required {
        upstream.list_mbeans(&pod_ip, agent).await?
    } else {
        Value::Object(Map::new())
    };
    Ok((pod_ip, catalog))
}

async fn handle_single(
    policy: &dyn PolicyEngine,
    upstream: &dyn JolokiaUpstream,
    role: Role,
    agent: &AgentInfo,
    request: JolokiaRequest,
) -> Result<SimpleResponse, GatewayError> {
    let (pod_ip, catalog) = fetch_context(upstream, agent, policy.requires_catalog(&request)).await?;

    let decision = policy.check(&request, role);
    if !decision.allowed {
        warn!(role = %role, kind = request.kind(), reason = ?decision.reason, "Request denied by ACL");
        return Err(match decision.reason {
            Some(reason) => GatewayError::rejected_reason(403, reason),
            None => GatewayError::Rejected { status: 403, body: json!({}) },
        });
    }

    let interception = policy.intercept(request, role, &catalog);
    if interception.intercepted {
        let response = interception.response.unwrap_or(Value::Null);
        let status = response
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(DEFAULT_INTERCEPT_STATUS);
        return Ok(SimpleResponse::json(status, &response));
    }

    // The original body goes upstream untouched
    upstream.call_agent(&pod_ip, agent, Some(agent.body.clone())).await
}

async fn handle_bulk(
    policy: &dyn PolicyEngine,
    upstream: &dyn JolokiaUpstream,
    role: Role,
    agent: &AgentInfo,
    requests: Vec<JolokiaRequest>,
) -> Result<SimpleResponse, GatewayError> {
    let catalog_required = requests.iter().any(|r| policy.requires_catalog(r));
    let (pod_ip, catalog) = fetch_context(upstream, agent, catalog_required).await?;

    let decisions: Vec<RbacDecision> = requests.iter().map(|r| policy.check(r, role)).collect();

    let interceptions: Vec<InterceptionResult> = requests
        .iter()
        .zip(&decisions)
        .filter(|(_, d)| d.allowed)
        .map(|(r, _)| policy.intercept(r.clone(), role, &catalog))
        .collect();

    let forward_batch: Vec<Value> = interceptions
        .iter()
        .filter(|i| !i.intercepted)
        .map(|i| i.request.to_value())
        .collect();

    debug!(
        total = requests.len(),
        denied = decisions.iter().filter(|d| !d.allowed).count(),
        forwarded = forward_batch.len(),
        "Bulk request evaluated"
    );

    let (status, headers, results) = if forward_batch.is_empty() {
        (200, Default::default(), Vec::new())
    } else {
        let body = Bytes::from(serde_json::to_vec(&forward_batch)?);
        let response = upstream.call_agent(&pod_ip, agent, Some(body)).await?;
        let results = parse_bulk_results(&response.body, forward_batch.len())?;
        (response.status, response.headers, results)
    };

    let bulk = reassemble(&requests, &decisions, interceptions, results)?;
    Ok(SimpleResponse::new(status, serde_json::to_string(&bulk)?).with_headers(headers))
}

/// The agent's bulk reply must be an array matching the forwarded batch
fn parse_bulk_results(body: &str, expected: usize) -> Result<Vec<Value>, GatewayError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) if items.len() == expected => Ok(items),
        Value::Array(items) => Err(GatewayError::Upstream {
            status: None,
            message: format!(
                "Jolokia agent answered {} results for {} forwarded requests",
                items.len(),
                expected
            ),
        }),
        _ => Err(GatewayError::Upstream {
            status: None,
            message: "Jolokia agent answered a bulk request without an array".to_string(),
        }),
    }
}

fn pool_exhausted(pool: &str) -> GatewayError {
    GatewayError::Unclassified(format!("Bulk reassembly ran out of {} results", pool))
}

/// Rebuild the bulk response in the order of `requests`
///
/// `interceptions` lines up with the allowed requests, `upstream` with the
/// non-intercepted ones. Both pools are consumed strictly front to back, so
/// each filtered stage keeps its relative order and the final walk over
/// `decisions` restores the original positions.
pub fn reassemble(
    requests: &[JolokiaRequest],
    decisions: &[RbacDecision],
    interceptions: Vec<InterceptionResult>,
    upstream: Vec<Value>,
) -> Result<Vec<Value>, GatewayError> {
    let mut upstream: VecDeque<Value> = upstream.into();
    let mut stage: VecDeque<Value> = VecDeque::with_capacity(interceptions.len());

    for interception in interceptions {
        if interception.intercepted {
            let canned = interception.response.unwrap_or_else(|| {
                json!({ "request": interception.request.to_value(), "status": DEFAULT_INTERCEPT_STATUS })
            });
            stage.push_back(canned);
        } else {
            stage.push_back(upstream.pop_front().ok_or_else(|| pool_exhausted("upstream"))?);
        }
    }

    let mut bulk = Vec::with_capacity(requests.len());
    for (request, decision) in requests.iter().zip(decisions) {
        if decision.allowed {
            bulk.push(stage.pop_front().ok_or_else(|| pool_exhausted("allowed"))?);
        } else {
            let mut denied = Map::new();
            denied.insert("request".to_string(), request.to_value());
            denied.insert("status".to_string(), json!(403));
            if let Some(reason) = &decision.reason {
                denied.insert("reason".to_string(), json!(reason));
            }
            bulk.push(Value::Object(denied));
        }
    }

    Ok(bulk)
}
