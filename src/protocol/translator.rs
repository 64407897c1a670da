// Translates inbound GET paths and POST bodies into Jolokia requests

use axum::http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::trace;

use crate::core::errors::GatewayError;
use crate::protocol::request::{JolokiaPayload, JolokiaRequest};

/// GET path form: `...jolokia/<type>/<arg1>/<arg2>/...`
static GET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*jolokia/(read|write|exec|search|list|version)/?(.*)")
        .expect("GET path pattern is a valid regex")
});

/// Parse a management request into a single Jolokia request or a bulk batch
///
/// POST requests are read from `body`; every other method is read from the
/// path (`path` may still carry its query string).
pub fn translate(method: &Method, path: &str, body: &[u8]) -> Result<JolokiaPayload, GatewayError> {
    if method == Method::POST {
        parse_post_body(body)
    } else {
        parse_get_path(path).map(JolokiaPayload::Single)
    }
}

/// Parse a POST body holding a request object or an array of them
///
/// A body that is itself a JSON string is decoded once more before matching.
pub fn parse_post_body(body: &[u8]) -> Result<JolokiaPayload, GatewayError> {
    let mut value: Value = serde_json::from_slice(body).map_err(|_| {
        GatewayError::Protocol(format!(
            "Unexpected Jolokia POST request body: {}",
            String::from_utf8_lossy(body)
        ))
    })?;

    if let Value::String(inner) = &value {
        value = serde_json::from_str(inner).map_err(|_| {
            GatewayError::Protocol(format!("Unexpected Jolokia POST request body: {}", inner))
        })?;
    }

    if let Some(request) = JolokiaRequest::from_value(&value) {
        return Ok(JolokiaPayload::Single(request));
    }

    if let Value::Array(items) = &value {
        let requests: Option<Vec<JolokiaRequest>> = items.iter().map(JolokiaRequest::from_value).collect();
        if let Some(requests) = requests {
            return Ok(JolokiaPayload::Bulk(requests));
        }
    }

    Err(GatewayError::Protocol(format!(
        "Unrecognised Jolokia POST request body (neither mbeanRequest nor MBeanRequestArray): {}",
        value
    )))
}

/// Parse a GET request path into a single Jolokia request
pub fn parse_get_path(path: &str) -> Result<JolokiaRequest, GatewayError> {
    let unexpected = || GatewayError::Protocol(format!("Unexpected Jolokia GET request: {}", path));

    let without_query = path.split('?').next().unwrap_or_default();
    let decoded = percent_decode_str(without_query)
        .decode_utf8()
        .map_err(|_| unexpected())?;

    let captures = GET_PATH.captures(&decoded).ok_or_else(unexpected)?;
    let kind = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let rest = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

    trace!(kind = %kind, rest = %rest, "Parsing Jolokia GET request");

    let args = split_segments(rest);
    let segment = |i: usize| args.get(i).filter(|s| !s.is_empty()).cloned();

    let request = match kind {
        // /read/<mbean>/<attribute>/<inner path>, inner path not supported
        "read" => {
            let mbean = segment(0).ok_or_else(unexpected)?;
            JolokiaRequest::read(mbean, segment(1).as_deref())
        }
        // /write/<mbean>/<attribute>/<value>/<inner path>
        "write" => {
            let mbean = segment(0).ok_or_else(unexpected)?;
            let attribute = segment(1).ok_or_else(unexpected)?;
            let value = args.get(2).cloned().map(Value::String).unwrap_or(Value::Null);
            JolokiaRequest::write(mbean, attribute, value)
        }
        // /exec/<mbean>/<operation>/<arg1>/<arg2>/...
        "exec" => {
            let mbean = segment(0).ok_or_else(unexpected)?;
            let operation = segment(1).ok_or_else(unexpected)?;
            let arguments = args.iter().skip(2).cloned().map(Value::String).collect();
            JolokiaRequest::exec(mbean, operation, arguments)
        }
        // /search/<pattern>
        "search" => {
            if rest.is_empty() {
                return Err(unexpected());
            }
            JolokiaRequest::search(unescape(rest))
        }
        // /list/<inner path>
        "list" => JolokiaRequest::list(Some(rest).filter(|p| !p.is_empty())),
        "version" => JolokiaRequest::version(),
        _ => return Err(unexpected()),
    };

    Ok(request)
}

/// Split a GET argument string on `/`, honouring Jolokia's `!/` and `!!` escapes
fn split_segments(rest: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('!'),
            },
            '/' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn unescape(value: &str) -> String {
    split_segments(value).join("/")
}
