// Unit tests for inbound request translation

use axum::http::Method;
use jolokia_gateway::core::errors::GatewayError;
use jolokia_gateway::protocol::{translate, JolokiaPayload, JolokiaRequest};
use serde_json::json;

#[test]
fn test_get_path_is_read_from_url() {
    let payload = translate(
        &Method::GET,
        "jolokia/read/java.lang:type=Memory/HeapMemoryUsage",
        b"ignored",
    )
    .unwrap();
    assert_eq!(
        payload,
        JolokiaPayload::Single(JolokiaRequest::read("java.lang:type=Memory", Some("HeapMemoryUsage")))
    );
}

#[test]
fn test_get_path_percent_decoded() {
    let payload = translate(&Method::GET, "jolokia/search/java.lang%3Atype%3D*", b"").unwrap();
    assert_eq!(payload, JolokiaPayload::Single(JolokiaRequest::search("java.lang:type=*")));
}

#[test]
fn test_post_single_object() {
    let body = json!({ "type": "exec", "mbean": "java.lang:type=Memory", "operation": "gc()" }).to_string();
    let payload = translate(&Method::POST, "jolokia/", body.as_bytes()).unwrap();
    assert_eq!(
        payload,
        JolokiaPayload::Single(JolokiaRequest::exec("java.lang:type=Memory", "gc()", vec![]))
    );
}

#[test]
fn test_post_bulk_keeps_order() {
    let body = json!([
        { "type": "version" },
        { "type": "read", "mbean": "java.lang:type=Runtime", "attribute": "Uptime" },
        { "type": "list" }
    ])
    .to_string();
    let payload = translate(&Method::POST, "jolokia/", body.as_bytes()).unwrap();
    let JolokiaPayload::Bulk(requests) = payload else {
        panic!("expected a bulk payload");
    };
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].kind(), "version");
    assert_eq!(requests[1], JolokiaRequest::read("java.lang:type=Runtime", Some("Uptime")));
    assert_eq!(requests[2].kind(), "list");
}

#[test]
fn test_post_double_encoded_body() {
    let inner = json!({ "type": "version" }).to_string();
    let body = serde_json::to_string(&inner).unwrap();
    let payload = translate(&Method::POST, "jolokia/", body.as_bytes()).unwrap();
    assert_eq!(payload, JolokiaPayload::Single(JolokiaRequest::version()));
}

#[test]
fn test_post_extra_fields_survive() {
    let body = json!({ "type": "list", "config": { "maxDepth": 7 } }).to_string();
    let JolokiaPayload::Single(request) = translate(&Method::POST, "jolokia/", body.as_bytes()).unwrap() else {
        panic!("expected a single payload");
    };
    assert_eq!(request.to_value()["config"]["maxDepth"], 7);
}

#[test]
fn test_post_unrecognised_body_is_protocol_error() {
    for body in ["42", "{\"type\":\"bogus\"}", "[{\"type\":\"version\"}, 7]", "not json"] {
        let err = translate(&Method::POST, "jolokia/", body.as_bytes()).unwrap_err();
        assert!(matches!(err, GatewayError::Protocol(_)), "body {} gave {:?}", body, err);
        assert_eq!(err.status_code(), 502);
    }
}

#[test]
fn test_get_unrecognised_path_is_protocol_error() {
    let err = translate(&Method::GET, "jolokia/frobnicate/x", b"").unwrap_err();
    assert!(matches!(err, GatewayError::Protocol(_)));
    assert!(err.to_string().contains("Unexpected Jolokia GET request"));
}
