// Bearer token subject extraction (unverified)

use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::{error, trace};

#[derive(Deserialize)]
struct Claims {
    sub: Option<String>,
}

/// Bearer token from the `Authorization` header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .map(|(_, token)| token.trim())
}

/// The `sub` claim of the caller's JWT, decoded without signature checks
///
/// This is NOT verification. The value only fills the `user` field of the
/// access review; the cluster's answer is the sole authorization decision.
pub fn subject_from_bearer(headers: &HeaderMap) -> Option<String> {
    let Some(token) = extract_bearer_token(headers) else {
        error!("Authorization header not found in request");
        return None;
    };

    // Claims are inspected only; the signing key belongs to the cluster
    let token_data = jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
        .map_err(|e| trace!(error = %e, "Bearer token is not a decodable JWT"))
        .ok()?;
    token_data.claims.sub
}
