// Final response shaping for every management outcome

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::core::models::SimpleResponse;
use crate::utils::mask_ip_addresses;

/// Turn a normalized outcome into the HTTP response sent to the caller
///
/// Drops `www-authenticate` from 401s so browsers do not raise a native
/// credential prompt, forces a JSON content type and applies IPv4 masking.
pub fn sanitize(response: SimpleResponse, mask_ip: bool) -> Response {
    let SimpleResponse { status, body, mut headers } = response;

    if status == StatusCode::UNAUTHORIZED.as_u16() {
        headers.remove(header::WWW_AUTHENTICATE);
    }
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = mask_ip_addresses(&body, mask_ip).into_owned();

    (status, headers, body).into_response()
}
