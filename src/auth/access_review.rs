// Cluster access review and role derivation

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::api::AccessReviewer;
use crate::auth::token::subject_from_bearer;
use crate::core::errors::GatewayError;
use crate::core::models::{AgentInfo, AuthMode, Role, SimpleResponse};
use crate::proxy::client::{cluster_client, json_request_headers, parse_cluster_json, relay_headers};
use crate::utils::join_paths;

/// Asks the cluster whether the caller may act on the target pod
pub struct AccessReviewClient {
    cluster_address: String,
    auth_mode: AuthMode,
}

impl AccessReviewClient {
    pub fn new(cluster_address: impl Into<String>, auth_mode: AuthMode) -> Self {
        Self {
            cluster_address: cluster_address.into(),
            auth_mode,
        }
    }

    fn api_group(&self) -> &'static str {
        match self.auth_mode {
            AuthMode::Form => "authorization.k8s.io",
            AuthMode::Platform => "authorization.openshift.io",
        }
    }

    /// `LocalSubjectAccessReview` body for the configured API shape
    pub fn review_body(&self, verb: &str, agent: &AgentInfo) -> Value {
        match self.auth_mode {
            AuthMode::Form => json!({
                "kind": "LocalSubjectAccessReview",
                "apiVersion": "authorization.k8s.io/v1",
                "metadata": { "namespace": agent.namespace },
                "spec": {
                    "user": subject_from_bearer(&agent.request_headers).unwrap_or_default(),
                    "resourceAttributes": {
                        "verb": verb,
                        "resource": "pods",
                        "name": agent.pod,
                        "namespace": agent.namespace,
                    },
                },
            }),
            AuthMode::Platform => json!({
                "kind": "LocalSubjectAccessReview",
                "apiVersion": "authorization.openshift.io/v1",
                "namespace": agent.namespace,
                "verb": verb,
                "resource": "pods",
                "name": agent.pod,
            }),
        }
    }

    /// `/apis/<group>/v1/namespaces/<ns>/localsubjectaccessreviews`
    pub fn review_uri(&self, namespace: &str) -> String {
        join_paths(&[
            self.cluster_address.as_str(),
            "apis",
            self.api_group(),
            "v1",
            "namespaces",
            namespace,
            "localsubjectaccessreviews",
        ])
    }

    fn allowed_field<'a>(&self, review: &'a Value) -> Option<&'a Value> {
        match self.auth_mode {
            AuthMode::Form => review.pointer("/status/allowed"),
            AuthMode::Platform => review.get("allowed"),
        }
    }
}

#[async_trait]
impl AccessReviewer for AccessReviewClient {
    async fn review_access(&self, verb: &str, agent: &AgentInfo) -> Result<SimpleResponse, GatewayError> {
        let uri = self.review_uri(&agent.namespace);
        trace!(uri = %uri, verb = %verb, "Verifying authorization");

        let response = cluster_client(&agent.ssl)?
            .post(&uri)
            .headers(json_request_headers(&agent.request_headers))
            .body(self.review_body(verb, agent).to_string())
            .send()
            .await?;

        let status = response.status();
        let headers = relay_headers(response.headers());

        if !status.is_success() {
            debug!(status = status.as_u16(), verb = %verb, "Access review failed");
            let message = status.canonical_reason().unwrap_or_default();
            return Ok(SimpleResponse::json(status.as_u16(), &json!({ "message": message })).with_headers(headers));
        }

        let review = parse_cluster_json(&response.text().await?)?;
        let allowed = match self.allowed_field(&review) {
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(GatewayError::Unclassified(
                    "Access review response carries no 'allowed' field".to_string(),
                ))
            }
        };

        trace!(verb = %verb, allowed = %allowed, "Access review result");
        Ok(SimpleResponse::new(status.as_u16(), allowed).with_headers(headers))
    }
}

fn review_rejected(response: SimpleResponse) -> GatewayError {
    GatewayError::rejected_reason(
        response.status,
        format!("Authorization was rejected: {}", response.body),
    )
}

fn review_denied(response: &SimpleResponse) -> GatewayError {
    GatewayError::rejected_message(
        403,
        format!("Subject Access Review Result: {{ allowed: {} }}", response.body),
    )
}

/// Map cluster verbs to a role: `update` grants admin, `get` grants viewer
pub async fn derive_role(reviewer: &dyn AccessReviewer, agent: &AgentInfo) -> Result<Role, GatewayError> {
    let update = reviewer.review_access("update", agent).await?;
    if !update.is_ok() {
        return Err(review_rejected(update));
    }
    if update.body == "true" {
        return Ok(Role::Admin);
    }

    let get = reviewer.review_access("get", agent).await?;
    if !get.is_ok() {
        return Err(review_rejected(get));
    }
    if get.body == "true" {
        return Ok(Role::Viewer);
    }

    warn!(namespace = %agent.namespace, pod = %agent.pod, "Caller holds neither update nor get on pod");
    Err(review_denied(&get))
}

/// Gate used when RBAC is off: only callers allowed to `update` the pod pass
pub async fn authorize_admin_only(reviewer: &dyn AccessReviewer, agent: &AgentInfo) -> Result<(), GatewayError> {
    let update = reviewer.review_access("update", agent).await?;
    if !update.is_ok() {
        return Err(review_rejected(update));
    }
    if update.body != "true" {
        warn!(namespace = %agent.namespace, pod = %agent.pod, "Caller may not update pod");
        return Err(review_denied(&update));
    }
    Ok(())
}
