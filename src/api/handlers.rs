// Request handlers for API endpoints

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, info};

use crate::api::responses::sanitize;
use crate::api::routing::AgentRoute;
use crate::api::AppState;
use crate::core::models::SimpleResponse;
use crate::proxy::proxy_jolokia_agent;

/// Management proxy handler
///
/// GET|POST /management/namespaces/{ns}/pods/{http|https}:{pod}:{port}/{path}
///
/// Request flow:
/// 1. Match the request target, 404 when it is not a management URL
/// 2. Strip the denylisted headers and bind the pod address
/// 3. Authorize and forward (RBAC or admin-only, per configuration)
/// 4. Normalize any failure into a response
/// 5. Sanitize headers and body
pub async fn management_handler(
    State(app_state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mask_ip = app_state.config.mask_ip_addresses;
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or_else(|| uri.path());

    let Some(route) = AgentRoute::parse(target) else {
        error!(request_id = %request_id, url = %target, "Management URL not recognized");
        let response = SimpleResponse::json(404, &json!({ "reason": "URL not recognized" }));
        return sanitize(response, mask_ip);
    };

    info!(
        request_id = %request_id,
        method = %method,
        namespace = %route.namespace,
        pod = %route.pod,
        port = route.port,
        "Received management request"
    );

    let agent = route.into_agent_info(method, &headers, body, app_state.ssl.clone());

    let response = match proxy_jolokia_agent(&app_state, &agent).await {
        Ok(response) => response,
        Err(e) => {
            error!(
                request_id = %request_id,
                namespace = %agent.namespace,
                pod = %agent.pod,
                error = %e,
                "Management request failed"
            );
            e.into_simple_response()
        }
    };

    sanitize(response, mask_ip)
}

/// Status endpoint
///
/// GET /status
pub async fn status_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "port": app_state.config.port,
        "loglevel": app_state.config.log_level,
    }))
}

/// Any method or path without a dedicated handler
pub async fn fallback_handler(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    error!(url = %uri, "Unhandled route");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "message": format!("Error (gateway-api): Access to {} is not permitted.", uri),
        })),
    )
}
