// Unit tests for response sanitizing and error normalization

use axum::http::{header, HeaderMap, StatusCode};
use jolokia_gateway::api::responses::sanitize;
use jolokia_gateway::core::errors::GatewayError;
use jolokia_gateway::core::models::SimpleResponse;
use jolokia_gateway::utils::IP_ADDRESS_MASK;
use serde_json::{json, Value};

async fn body_of(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_masking_enabled() {
    let outcome = SimpleResponse::json(200, &json!({ "value": { "podIP": "10.128.2.15", "host": "app" } }));
    let body = body_of(sanitize(outcome, true)).await;
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["value"]["podIP"], IP_ADDRESS_MASK);
    assert_eq!(parsed["value"]["host"], "app");
}

#[tokio::test]
async fn test_masking_ignores_unicode_word_boundaries() {
    let outcome = SimpleResponse::json(200, &json!({ "value": "é10.128.2.15" }));
    let body = body_of(sanitize(outcome, true)).await;
    let parsed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["value"], format!("é{}", IP_ADDRESS_MASK));
}

#[tokio::test]
async fn test_masking_disabled() {
    let outcome = SimpleResponse::json(200, &json!({ "value": "10.128.2.15" }));
    let body = body_of(sanitize(outcome, false)).await;
    assert!(body.contains("10.128.2.15"));
}

#[tokio::test]
async fn test_upstream_headers_relayed() {
    let mut headers = HeaderMap::new();
    headers.insert("x-jolokia-agent", "2.0".parse().unwrap());
    let response = sanitize(SimpleResponse::new(200, "{}").with_headers(headers), false);
    assert_eq!(response.headers().get("x-jolokia-agent").unwrap(), "2.0");
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
}

#[tokio::test]
async fn test_normalized_errors_keep_their_status() {
    let cases = vec![
        (GatewayError::Protocol("Unexpected Jolokia GET request: x".into()), StatusCode::BAD_GATEWAY),
        (GatewayError::rejected_reason(403, "denied"), StatusCode::FORBIDDEN),
        (
            GatewayError::Upstream { status: Some(401), message: "Unauthorized".into() },
            StatusCode::UNAUTHORIZED,
        ),
        (GatewayError::Upstream { status: None, message: "connection refused".into() }, StatusCode::BAD_GATEWAY),
        (GatewayError::Unclassified("boom".into()), StatusCode::BAD_GATEWAY),
    ];

    for (error, expected) in cases {
        let response = sanitize(error.into_simple_response(), false);
        assert_eq!(response.status(), expected);
        let body: Value = serde_json::from_str(&body_of(response).await).unwrap();
        assert!(body.is_object());
    }
}
