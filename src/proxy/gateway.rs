// RBAC and admin-only authorization flows in front of the Jolokia agent

use tracing::debug;

use crate::api::{AccessReviewer, AppState, JolokiaUpstream, PolicyEngine};
use crate::auth::{authorize_admin_only, derive_role};
use crate::core::errors::GatewayError;
use crate::core::models::{AgentInfo, SimpleResponse};
use crate::proxy::bulk::handle_request_with_role;

/// Derive the caller's role, then evaluate every request against the ACL
pub async fn proxy_with_rbac(
    reviewer: &dyn AccessReviewer,
    policy: &dyn PolicyEngine,
    upstream: &dyn JolokiaUpstream,
    agent: &AgentInfo,
) -> Result<SimpleResponse, GatewayError> {
    let role = derive_role(reviewer, agent).await?;
    debug!(role = %role, namespace = %agent.namespace, pod = %agent.pod, "Caller role derived");
    handle_request_with_role(policy, upstream, role, agent).await
}

/// Admin-only passthrough: no ACL evaluation and no interception
pub async fn proxy_without_rbac(
    reviewer: &dyn AccessReviewer,
    upstream: &dyn JolokiaUpstream,
    agent: &AgentInfo,
) -> Result<SimpleResponse, GatewayError> {
    authorize_admin_only(reviewer, agent).await?;
    let pod_ip = upstream.pod_ip(agent).await?;
    upstream.call_agent(&pod_ip, agent, Some(agent.body.clone())).await
}

/// Pick the flow for this process's RBAC setting
pub async fn proxy_jolokia_agent(state: &AppState, agent: &AgentInfo) -> Result<SimpleResponse, GatewayError> {
    match &state.policy {
        Some(policy) => {
            proxy_with_rbac(
                state.reviewer.as_ref(),
                policy.as_ref(),
                state.upstream.as_ref(),
                agent,
            )
            .await
        }
        None => proxy_without_rbac(state.reviewer.as_ref(), state.upstream.as_ref(), agent).await,
    }
}
