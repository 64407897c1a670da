// Axum web server layer

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routing;

use crate::core::errors::GatewayError;
use crate::core::models::{AgentInfo, InterceptionResult, RbacDecision, Role, SimpleResponse, SslOptions};
use crate::protocol::JolokiaRequest;

pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across async tasks.
/// `policy` is `None` when RBAC is disabled.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub reviewer: Arc<dyn AccessReviewer + Send + Sync>,
    pub upstream: Arc<dyn JolokiaUpstream + Send + Sync>,
    pub policy: Option<Arc<dyn PolicyEngine + Send + Sync>>,
    pub ssl: Arc<SslOptions>,
}

/// Cluster "can-I" check for the caller on the target pod
///
/// The body of an ok response is the literal `true` or `false`. A non-ok
/// response is returned as-is for the caller to judge.
#[async_trait::async_trait]
pub trait AccessReviewer: Send + Sync {
    async fn review_access(&self, verb: &str, agent: &AgentInfo) -> Result<SimpleResponse, GatewayError>;
}

/// Calls into the cluster API and the pod's Jolokia agent
#[async_trait::async_trait]
pub trait JolokiaUpstream: Send + Sync {
    /// `status.podIP` of the target pod
    async fn pod_ip(&self, agent: &AgentInfo) -> Result<String, GatewayError>;

    /// The agent's `list` value (the live MBean catalog)
    async fn list_mbeans(&self, pod_ip: &str, agent: &AgentInfo) -> Result<Value, GatewayError>;

    /// Forward to the agent with the inbound method; `body` is sent for POST
    async fn call_agent(
        &self,
        pod_ip: &str,
        agent: &AgentInfo,
        body: Option<Bytes>,
    ) -> Result<SimpleResponse, GatewayError>;
}

/// ACL-driven decisions for individual Jolokia requests
pub trait PolicyEngine: Send + Sync {
    /// Whether deciding this request needs the live MBean catalog
    fn requires_catalog(&self, request: &JolokiaRequest) -> bool;

    fn check(&self, request: &JolokiaRequest, role: Role) -> RbacDecision;

    /// Answer locally or hand the request back for forwarding
    fn intercept(&self, request: JolokiaRequest, role: Role, catalog: &Value) -> InterceptionResult;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Security headers
/// - CORS (credentials allowed)
/// - Tracing (tower-http::trace)
/// - Body size limit (tower-http::limit)
/// - `X-HTTP-Method-Override` on POST
pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.body_size_limit_bytes;

    let management = get(handlers::management_handler)
        .post(handlers::management_handler)
        .fallback(handlers::fallback_handler);

    let mut router = Router::new()
        .route("/management", management.clone())
        .route("/management/", management.clone())
        .route("/management/*rest", management)
        .route("/status", get(handlers::status_handler).fallback(handlers::fallback_handler))
        .fallback(handlers::fallback_handler)
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::method_override))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::body_size_limit_layer(body_limit))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer());

    for layer in middleware::security_header_layers() {
        router = router.layer(layer);
    }

    router
}
