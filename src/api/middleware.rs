// Middleware stack for security headers, CORS, observability and body limits

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::debug;

/// Header a client uses to tunnel another method through POST
pub const METHOD_OVERRIDE_HEADER: &str = "x-http-method-override";

/// Tracing middleware
///
/// Logs method, path, status and latency for every request.
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Body size limit middleware
///
/// Returns 413 Payload Too Large if exceeded
pub fn body_size_limit_layer(limit: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limit)
}

/// Cross-origin support with credentials
pub fn cors_layer() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Security headers set on every response unless a handler already set them
///
/// - Strict-Transport-Security: one year, subdomains included
/// - X-Frame-Options: SAMEORIGIN
/// - Content-Security-Policy: same-origin only
/// - X-Content-Type-Options: nosniff
pub fn security_header_layers() -> [SetResponseHeaderLayer<HeaderValue>; 4] {
    [
        header_layer(
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ),
        header_layer(header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        header_layer(
            header::CONTENT_SECURITY_POLICY,
            "default-src 'self'; frame-ancestors 'self'; form-action 'self'",
        ),
        header_layer(header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    ]
}

fn header_layer(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

/// Replace a POST's method with the one named in `X-HTTP-Method-Override`
///
/// Runs before method dispatch, so an overridden request is routed as if it
/// had been sent with that method. Unparseable values are ignored.
pub async fn method_override(mut request: Request, next: Next) -> Response {
    if request.method() == Method::POST {
        let overridden = request
            .headers()
            .get(METHOD_OVERRIDE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| Method::from_bytes(v.trim().to_uppercase().as_bytes()).ok());

        if let Some(method) = overridden {
            debug!(method = %method, "Request method overridden");
            *request.method_mut() = method;
        }
    }
    next.run(request).await
}
