// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use jolokia_gateway::api::{AccessReviewer, AppState, JolokiaUpstream, PolicyEngine};
use jolokia_gateway::config::Config;
use jolokia_gateway::core::errors::GatewayError;
use jolokia_gateway::core::models::{
    AgentInfo, InterceptionResult, Protocol, RbacDecision, Role, SimpleResponse, SslOptions,
};
use jolokia_gateway::engine::AclPolicyEngine;
use jolokia_gateway::loader::AclDocument;
use jolokia_gateway::protocol::JolokiaRequest;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// ACL shared by the suites
pub const TEST_ACL: &str = r#"
jmx.acl:
  list*: viewer, admin
  get*: viewer, admin
  is*: viewer, admin
  canInvoke*: viewer, admin
  set*: admin
  "*": admin
jmx.acl.java.lang.Memory:
  gc: viewer, admin
jmx.acl.java.util.logging:
  'setLoggerLevel(java.lang.String,java.lang.String)["root", /INFO|WARNING/]': viewer, admin
  setLoggerLevel: admin
"#;

pub fn test_document() -> AclDocument {
    AclDocument::from_yaml_str(TEST_ACL).unwrap()
}

pub fn test_policy() -> AclPolicyEngine {
    AclPolicyEngine::new(test_document())
}

/// Agent context for `ns1/mypod` with the given method, path and body
pub fn test_agent(method: Method, path: &str, body: &str) -> AgentInfo {
    AgentInfo {
        method,
        request_headers: HeaderMap::new(),
        body: Bytes::from(body.to_string()),
        ssl: Arc::new(SslOptions::default()),
        namespace: "ns1".to_string(),
        protocol: Protocol::Https,
        pod: "mypod".to_string(),
        port: 8778,
        path: path.to_string(),
    }
}

/// Mock AccessReviewer answering each verb from a table
pub struct MockReviewer {
    pub answers: HashMap<&'static str, SimpleResponse>,
    pub asked: Mutex<Vec<String>>,
}

impl MockReviewer {
    pub fn new(update: SimpleResponse, get: SimpleResponse) -> Self {
        let mut answers = HashMap::new();
        answers.insert("update", update);
        answers.insert("get", get);
        Self {
            answers,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn admin() -> Self {
        Self::new(SimpleResponse::new(200, "true"), SimpleResponse::new(200, "true"))
    }

    pub fn viewer() -> Self {
        Self::new(SimpleResponse::new(200, "false"), SimpleResponse::new(200, "true"))
    }

    pub fn nobody() -> Self {
        Self::new(SimpleResponse::new(200, "false"), SimpleResponse::new(200, "false"))
    }

    pub fn failing(status: u16) -> Self {
        let response = SimpleResponse::json(status, &json!({ "message": "Internal Server Error" }));
        Self::new(response.clone(), response)
    }
}

#[async_trait::async_trait]
impl AccessReviewer for MockReviewer {
    async fn review_access(&self, verb: &str, _agent: &AgentInfo) -> Result<SimpleResponse, GatewayError> {
        self.asked.lock().unwrap().push(verb.to_string());
        self.answers
            .get(verb)
            .cloned()
            .ok_or_else(|| GatewayError::Unclassified(format!("unexpected verb {}", verb)))
    }
}

/// Mock JolokiaUpstream
///
/// Bulk bodies are answered item by item with
/// `{request, value: "upstream", status: 200}`; single calls get `single_body`.
pub struct MockUpstream {
    pub pod_ip: String,
    pub catalog: Value,
    pub single_body: String,
    pub single_status: u16,
    pub single_headers: HeaderMap,
    pub pod_ip_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub forwarded: Mutex<Vec<Option<Bytes>>>,
}

impl Default for MockUpstream {
    fn default() -> Self {
        Self {
            pod_ip: "10.1.2.3".to_string(),
            catalog: json!({}),
            single_body: json!({ "value": "upstream", "status": 200 }).to_string(),
            single_status: 200,
            single_headers: HeaderMap::new(),
            pod_ip_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            forwarded: Mutex::new(Vec::new()),
        }
    }
}

impl MockUpstream {
    pub fn pod_ip_calls(&self) -> usize {
        self.pod_ip_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn forwarded_count(&self) -> usize {
        self.forwarded.lock().unwrap().len()
    }

    /// Last forwarded body parsed as JSON
    pub fn last_forwarded(&self) -> Option<Value> {
        let forwarded = self.forwarded.lock().unwrap();
        forwarded
            .last()
            .cloned()
            .flatten()
            .and_then(|body| serde_json::from_slice(&body).ok())
    }
}

#[async_trait::async_trait]
impl JolokiaUpstream for MockUpstream {
    async fn pod_ip(&self, _agent: &AgentInfo) -> Result<String, GatewayError> {
        self.pod_ip_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pod_ip.clone())
    }

    async fn list_mbeans(&self, _pod_ip: &str, _agent: &AgentInfo) -> Result<Value, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }

    async fn call_agent(
        &self,
        _pod_ip: &str,
        _agent: &AgentInfo,
        body: Option<Bytes>,
    ) -> Result<SimpleResponse, GatewayError> {
        self.forwarded.lock().unwrap().push(body.clone());

        let parsed: Option<Value> = body.as_ref().and_then(|b| serde_json::from_slice(b).ok());
        if let Some(Value::Array(items)) = parsed {
            let results: Vec<Value> = items
                .into_iter()
                .map(|request| json!({ "request": request, "value": "upstream", "status": 200 }))
                .collect();
            return Ok(SimpleResponse::json(200, &Value::Array(results)));
        }

        Ok(SimpleResponse::new(self.single_status, self.single_body.clone())
            .with_headers(self.single_headers.clone()))
    }
}

/// Mock PolicyEngine that allows everything and intercepts nothing
pub struct AllowAllPolicy;

impl PolicyEngine for AllowAllPolicy {
    fn requires_catalog(&self, _request: &JolokiaRequest) -> bool {
        false
    }

    fn check(&self, _request: &JolokiaRequest, _role: Role) -> RbacDecision {
        RbacDecision::allow()
    }

    fn intercept(&self, request: JolokiaRequest, _role: Role, _catalog: &Value) -> InterceptionResult {
        InterceptionResult::passthrough(request)
    }
}

/// App state over mocks; `policy` of `None` disables RBAC
pub fn create_test_app_state(
    reviewer: Arc<MockReviewer>,
    upstream: Arc<MockUpstream>,
    policy: Option<Arc<dyn PolicyEngine + Send + Sync>>,
) -> AppState {
    let mut config = Config::test_config();
    if policy.is_none() {
        config.rbac_acl_path = None;
    }
    AppState {
        config: Arc::new(config),
        reviewer,
        upstream,
        policy,
        ssl: Arc::new(SslOptions::default()),
    }
}
