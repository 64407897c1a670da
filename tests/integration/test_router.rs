// Router-level tests: full request handling over mocked cluster and agent

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
};
use jolokia_gateway::api::{create_router, AppState, PolicyEngine};
use jolokia_gateway::engine::interceptor::RBAC_SEARCH_PATTERN;
use serde_json::{json, Value};
use static_assertions::assert_impl_all;
use std::sync::Arc;
use tower::ServiceExt;

use crate::common::*;

assert_impl_all!(AppState: Send, Sync, Clone);

const POD_URL: &str = "/management/namespaces/ns1/pods/https:mypod:8778";

fn rbac_state(reviewer: MockReviewer, upstream: Arc<MockUpstream>) -> AppState {
    let policy: Arc<dyn PolicyEngine + Send + Sync> = Arc::new(test_policy());
    create_test_app_state(Arc::new(reviewer), upstream, Some(policy))
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response: Response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_status_endpoint() {
    let state = rbac_state(MockReviewer::admin(), Arc::new(MockUpstream::default()));
    let (status, _, body) = send(state, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "port": 3000, "loglevel": "info" }));
}

#[tokio::test]
async fn test_unknown_route_is_502() {
    let state = rbac_state(MockReviewer::admin(), Arc::new(MockUpstream::default()));
    let (status, _, body) = send(state, get("/nowhere")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "Error (gateway-api): Access to /nowhere is not permitted.");
}

#[tokio::test]
async fn test_unsupported_method_on_management_is_502() {
    let state = rbac_state(MockReviewer::admin(), Arc::new(MockUpstream::default()));
    let request = Request::builder()
        .method("PUT")
        .uri(format!("{}/jolokia/version", POD_URL))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(state, request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unrecognized_management_url_is_404() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::admin(), upstream.clone());
    let (status, headers, body) = send(state, get("/management/namespaces/ns1/pods/mypod")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "reason": "URL not recognized" }));
    assert_eq!(upstream.pod_ip_calls(), 0);
}

#[tokio::test]
async fn test_rbac_get_read_forwarded() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::viewer(), upstream.clone());
    let uri = format!("{}/jolokia/read/java.lang:type=Memory/HeapMemoryUsage", POD_URL);
    let (status, _, body) = send(state, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["value"], "upstream");
    assert_eq!(upstream.forwarded_count(), 1);
}

#[tokio::test]
async fn test_rbac_single_denied_is_403() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::viewer(), upstream.clone());
    let request = post(
        &format!("{}/jolokia/", POD_URL),
        json!({ "type": "exec", "mbean": "java.lang:type=Threading", "operation": "resetPeakThreadCount()" }),
    );
    let (status, _, body) = send(state, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["reason"].as_str().unwrap().contains("resetPeakThreadCount"));
    assert_eq!(upstream.forwarded_count(), 0);
}

#[tokio::test]
async fn test_rbac_bulk_mixed_outcomes() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::viewer(), upstream.clone());
    let items = json!([
        { "type": "version" },
        { "type": "exec", "mbean": "java.lang:type=Threading", "operation": "resetPeakThreadCount()" },
        { "type": "search", "mbean": RBAC_SEARCH_PATTERN }
    ]);
    let (status, _, body) = send(state, post(&format!("{}/jolokia/", POD_URL), items.clone())).await;

    assert_eq!(status, StatusCode::OK);
    let results: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["value"], "upstream");
    assert_eq!(results[1]["status"], 403);
    assert_eq!(results[1]["request"], items[1]);
    assert_eq!(results[2]["status"], 200);
}

#[tokio::test]
async fn test_access_review_failure_propagates_status() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::failing(500), upstream.clone());
    let (status, _, body) = send(state, get(&format!("{}/jolokia/version", POD_URL))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["reason"].as_str().unwrap().starts_with("Authorization was rejected"));
    assert_eq!(upstream.pod_ip_calls(), 0);
}

#[tokio::test]
async fn test_caller_without_pod_access_is_403() {
    let state = rbac_state(MockReviewer::nobody(), Arc::new(MockUpstream::default()));
    let (status, _, body) = send(state, get(&format!("{}/jolokia/version", POD_URL))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["message"], "Subject Access Review Result: { allowed: false }");
}

#[tokio::test]
async fn test_without_rbac_admin_passes_body_through() {
    let upstream = Arc::new(MockUpstream::default());
    let reviewer = Arc::new(MockReviewer::admin());
    let state = create_test_app_state(reviewer.clone(), upstream.clone(), None);
    let request = post(
        &format!("{}/jolokia/", POD_URL),
        json!({ "type": "exec", "mbean": "java.lang:type=Threading", "operation": "resetPeakThreadCount()" }),
    );
    let (status, _, _) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.forwarded_count(), 1);
    assert_eq!(upstream.last_forwarded().unwrap()["operation"], "resetPeakThreadCount()");
    assert_eq!(*reviewer.asked.lock().unwrap(), vec!["update".to_string()]);
}

#[tokio::test]
async fn test_without_rbac_viewer_is_rejected() {
    let upstream = Arc::new(MockUpstream::default());
    let state = create_test_app_state(Arc::new(MockReviewer::viewer()), upstream.clone(), None);
    let (status, _, _) = send(state, get(&format!("{}/jolokia/version", POD_URL))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(upstream.forwarded_count(), 0);
}

#[tokio::test]
async fn test_without_rbac_nothing_is_intercepted() {
    let upstream = Arc::new(MockUpstream::default());
    let policy: Arc<dyn PolicyEngine + Send + Sync> = Arc::new(AllowAllPolicy);
    let state = create_test_app_state(Arc::new(MockReviewer::admin()), upstream.clone(), Some(policy));
    let uri = format!("{}/jolokia/search/{}", POD_URL, RBAC_SEARCH_PATTERN);
    let (status, _, _) = send(state, get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.forwarded_count(), 1);
}

#[tokio::test]
async fn test_ip_addresses_masked_when_enabled() {
    let upstream = Arc::new(MockUpstream {
        single_body: json!({ "value": { "podIP": "10.128.2.15" }, "status": 200 }).to_string(),
        ..MockUpstream::default()
    });
    let mut state = rbac_state(MockReviewer::admin(), upstream.clone());
    let mut config = (*state.config).clone();
    config.mask_ip_addresses = true;
    state.config = Arc::new(config);

    let (_, _, body) = send(state, get(&format!("{}/jolokia/version", POD_URL))).await;
    assert!(!body.contains("10.128.2.15"));
    assert!(body.contains("***.***.***.***"));

    let unmasked = rbac_state(MockReviewer::admin(), upstream);
    let (_, _, body) = send(unmasked, get(&format!("{}/jolokia/version", POD_URL))).await;
    assert!(body.contains("10.128.2.15"));
}

#[tokio::test]
async fn test_www_authenticate_stripped_on_401() {
    let mut single_headers = HeaderMap::new();
    single_headers.insert(header::WWW_AUTHENTICATE, "Basic realm=\"jolokia\"".parse().unwrap());
    let upstream = Arc::new(MockUpstream {
        single_status: 401,
        single_body: "{}".to_string(),
        single_headers,
        ..MockUpstream::default()
    });
    let state = create_test_app_state(Arc::new(MockReviewer::admin()), upstream, None);
    let (status, headers, _) = send(state, get(&format!("{}/jolokia/version", POD_URL))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::WWW_AUTHENTICATE).is_none());
}

#[tokio::test]
async fn test_security_headers_present() {
    let state = rbac_state(MockReviewer::admin(), Arc::new(MockUpstream::default()));
    let (_, headers, _) = send(state, get("/status")).await;

    assert_eq!(
        headers.get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
        "max-age=31536000; includeSubDomains"
    );
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert!(headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'self'"));
}

#[tokio::test]
async fn test_bare_management_paths_are_404() {
    for uri in ["/management", "/management/"] {
        let upstream = Arc::new(MockUpstream::default());
        let state = rbac_state(MockReviewer::admin(), upstream.clone());
        let (status, _, body) = send(state, post(uri, json!({ "type": "version" }))).await;

        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "reason": "URL not recognized" }));
        assert_eq!(upstream.pod_ip_calls(), 0);
    }
}

#[tokio::test]
async fn test_method_override_routes_post_as_get() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::viewer(), upstream.clone());
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}/jolokia/version", POD_URL))
        .header("x-http-method-override", "get")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["value"], "upstream");
    assert_eq!(upstream.forwarded_count(), 1);
}

#[tokio::test]
async fn test_method_override_to_unsupported_method_is_502() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::admin(), upstream.clone());
    let request = Request::builder()
        .method("POST")
        .uri(format!("{}/jolokia/version", POD_URL))
        .header("x-http-method-override", "DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(state, request).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(upstream.pod_ip_calls(), 0);
}

#[tokio::test]
async fn test_method_override_ignored_on_get() {
    let upstream = Arc::new(MockUpstream::default());
    let state = rbac_state(MockReviewer::admin(), upstream.clone());
    let request = Request::builder()
        .uri(format!("{}/jolokia/version", POD_URL))
        .header("x-http-method-override", "DELETE")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(state, request).await;

    assert_eq!(status, StatusCode::OK);
}
