// Request interception - Answers RBAC discovery and canInvoke queries locally

use chrono::Utc;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

use crate::core::models::{InterceptionResult, Role};
use crate::engine::evaluator::{can_read, evaluate_call, grants_any};
use crate::engine::object_name::ObjectName;
use crate::engine::pattern_matcher::OperationCall;
use crate::loader::AclDocument;
use crate::protocol::JolokiaRequest;

/// MBean the console queries for invocation rights
pub const RBAC_MBEAN: &str = "hawtio:type=security,area=jmx,name=HawtioOnlineRBAC";

/// Search the console issues to discover the RBAC MBean
pub const RBAC_SEARCH_PATTERN: &str = "hawtio:type=security,area=jmx,*";

/// MBean whose `list()` returns the optimised, annotated catalog
pub const RBAC_REGISTRY_MBEAN: &str = "hawtio:type=security,name=RBACRegistry";

const REGISTRY_LIST: &str = "list()";
const CAN_INVOKE_MBEAN: &str = "canInvoke(java.lang.String)";
const CAN_INVOKE_OPERATION: &str = "canInvoke(java.lang.String,java.lang.String)";
const CAN_INVOKE_SIGNATURE: &str = "canInvoke(java.lang.String,java.lang.String,[Ljava.lang.String;)";
const CAN_INVOKE_BULK: &str = "canInvoke(java.util.Map)";

/// Only the registry listing needs the live MBean catalog
pub fn requires_catalog(request: &JolokiaRequest) -> bool {
    matches!(
        request,
        JolokiaRequest::Exec { mbean, operation, .. }
            if mbean == RBAC_REGISTRY_MBEAN && operation == REGISTRY_LIST
    )
}

/// Answer a request locally when it targets one of the RBAC MBeans
pub fn intercept(document: &AclDocument, request: JolokiaRequest, role: Role, catalog: &Value) -> InterceptionResult {
    let answer = match &request {
        JolokiaRequest::Search { mbean, .. } if mbean == RBAC_SEARCH_PATTERN => Some(Ok(json!([RBAC_MBEAN]))),
        JolokiaRequest::Exec { mbean, operation, arguments, .. } if mbean == RBAC_MBEAN => {
            match operation.as_str() {
                CAN_INVOKE_MBEAN => Some(can_invoke_mbean(document, arguments, role)),
                CAN_INVOKE_OPERATION => Some(can_invoke_operation(document, arguments, false, role)),
                CAN_INVOKE_SIGNATURE => Some(can_invoke_operation(document, arguments, true, role)),
                CAN_INVOKE_BULK => Some(can_invoke_bulk(document, arguments, role)),
                _ => None,
            }
        }
        JolokiaRequest::Exec { mbean, operation, .. }
            if mbean == RBAC_REGISTRY_MBEAN && operation == REGISTRY_LIST =>
        {
            Some(Ok(register_list(document, catalog, role)))
        }
        _ => None,
    };

    match answer {
        Some(Ok(value)) => {
            debug!(kind = request.kind(), mbean = ?request.mbean(), "Intercepted request");
            let response = canned(&request, value);
            InterceptionResult::intercepted(request, response)
        }
        Some(Err(message)) => {
            debug!(error = %message, "Intercepted request with invalid arguments");
            let response = canned_error(&request, &message);
            InterceptionResult::intercepted(request, response)
        }
        None => InterceptionResult::passthrough(request),
    }
}

fn canned(request: &JolokiaRequest, value: Value) -> Value {
    json!({
        "request": request.to_value(),
        "value": value,
        "status": 200,
        "timestamp": Utc::now().timestamp(),
    })
}

fn canned_error(request: &JolokiaRequest, message: &str) -> Value {
    json!({
        "request": request.to_value(),
        "error_type": "java.lang.IllegalArgumentException",
        "error": format!("java.lang.IllegalArgumentException : {}", message),
        "status": 400,
        "timestamp": Utc::now().timestamp(),
    })
}

fn string_arg<'a>(arguments: &'a [Value], index: usize) -> Result<&'a str, String> {
    arguments
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("argument {} must be a string", index))
}

fn parse_name(mbean: &str) -> Result<ObjectName, String> {
    ObjectName::parse(mbean)
}

fn operation_allowed(document: &AclDocument, name: &ObjectName, call: &OperationCall<'_>, role: Role) -> bool {
    evaluate_call(document, name, call, role).allowed
}

fn can_invoke_mbean(document: &AclDocument, arguments: &[Value], role: Role) -> Result<Value, String> {
    let name = parse_name(string_arg(arguments, 0)?)?;
    Ok(Value::Bool(grants_any(document, &name, role)))
}

fn can_invoke_operation(document: &AclDocument, arguments: &[Value], with_signature: bool, role: Role) -> Result<Value, String> {
    let name = parse_name(string_arg(arguments, 0)?)?;
    let operation = string_arg(arguments, 1)?;

    let mut call = OperationCall::parse(operation, None);
    if with_signature {
        let signature = arguments
            .get(2)
            .and_then(Value::as_array)
            .ok_or_else(|| "argument 2 must be an array of type names".to_string())?
            .iter()
            .map(|t| t.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| "argument 2 must be an array of type names".to_string())?;
        call.signature = Some(signature);
    }

    Ok(Value::Bool(operation_allowed(document, &name, &call, role)))
}

/// `{mbean: [op, ...]}` answered as `{mbean: {op: {CanInvoke, Method, ObjectName}}}`
///
/// An MBean asked about with no operations is answered for the MBean itself.
fn can_invoke_bulk(document: &AclDocument, arguments: &[Value], role: Role) -> Result<Value, String> {
    let query = arguments
        .first()
        .and_then(Value::as_object)
        .ok_or_else(|| "argument 0 must be a map of MBean names to operations".to_string())?;

    let mut result = Map::new();
    for (mbean, operations) in query {
        let name = parse_name(mbean)?;
        let operations = operations
            .as_array()
            .ok_or_else(|| format!("operations for '{}' must be an array", mbean))?;

        if operations.is_empty() {
            result.insert(
                mbean.clone(),
                json!({
                    "CanInvoke": grants_any(document, &name, role),
                    "Method": "",
                    "ObjectName": mbean,
                }),
            );
            continue;
        }

        let mut per_operation = Map::new();
        for operation in operations {
            let operation = operation
                .as_str()
                .ok_or_else(|| format!("operations for '{}' must be strings", mbean))?;
            let call = OperationCall::parse(operation, None);
            per_operation.insert(
                operation.to_string(),
                json!({
                    "CanInvoke": operation_allowed(document, &name, &call, role),
                    "Method": operation,
                    "ObjectName": mbean,
                }),
            );
        }
        result.insert(mbean.clone(), Value::Object(per_operation));
    }

    Ok(Value::Object(result))
}

/// Annotate the live catalog with `canInvoke` and fold repeated MBean shapes
/// into a shared cache
///
/// Output: `{cache: {key: info}, domains: {domain: {props: info | key}}}`.
/// Identical annotated infos seen more than once are stored once under
/// `cache` and referenced from `domains` by key.
pub fn register_list(document: &AclDocument, catalog: &Value, role: Role) -> Value {
    let Some(domains) = catalog.as_object() else {
        return json!({ "cache": {}, "domains": {} });
    };

    let mut annotated: Vec<(String, String, Value, String)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (domain, mbeans) in domains {
        let Some(mbeans) = mbeans.as_object() else { continue };
        for (props, info) in mbeans {
            let info = annotate_mbean(document, &format!("{}:{}", domain, props), info, role);
            let fingerprint = info.to_string();
            *seen.entry(fingerprint.clone()).or_default() += 1;
            annotated.push((domain.clone(), props.clone(), info, fingerprint));
        }
    }

    let mut cache = Map::new();
    let mut out_domains = Map::new();
    for (domain, props, info, fingerprint) in annotated {
        let entry = if seen.get(&fingerprint).copied().unwrap_or_default() > 1 {
            let key = cache_key(&fingerprint);
            cache.entry(key.clone()).or_insert(info);
            Value::String(key)
        } else {
            info
        };

        if let Value::Object(map) = out_domains
            .entry(domain)
            .or_insert_with(|| Value::Object(Map::new()))
        {
            map.insert(props, entry);
        }
    }

    json!({ "cache": cache, "domains": out_domains })
}

fn cache_key(fingerprint: &str) -> String {
    let digest = hex::encode(Sha256::digest(fingerprint.as_bytes()));
    format!("mbean:{}", &digest[..16])
}

fn annotate_mbean(document: &AclDocument, mbean: &str, info: &Value, role: Role) -> Value {
    let Value::Object(mut fields) = info.clone() else {
        return info.clone();
    };

    let name = match ObjectName::parse(mbean) {
        Ok(name) => name,
        Err(e) => {
            debug!(mbean = %mbean, error = %e, "Catalog entry has an invalid name");
            fields.insert("canInvoke".to_string(), Value::Bool(false));
            return Value::Object(fields);
        }
    };

    let mut any_member = false;
    let mut any_invokable = false;

    if let Some(Value::Object(operations)) = fields.get_mut("op") {
        for (op_name, overloads) in operations.iter_mut() {
            let mut annotate = |op_info: &mut Value| {
                let signature = op_info
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|args| {
                        args.iter()
                            .filter_map(|a| a.get("type").and_then(Value::as_str).map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                let call = OperationCall::new(op_name.clone(), Some(signature), None);
                let allowed = operation_allowed(document, &name, &call, role);
                if let Value::Object(o) = op_info {
                    o.insert("canInvoke".to_string(), Value::Bool(allowed));
                }
                any_member = true;
                any_invokable |= allowed;
            };

            match overloads {
                Value::Array(list) => list.iter_mut().for_each(&mut annotate),
                single => annotate(single),
            }
        }
    }

    if let Some(Value::Object(attributes)) = fields.get_mut("attr") {
        for (attr_name, attr_info) in attributes.iter_mut() {
            let writable = attr_info.get("rw").and_then(Value::as_bool).unwrap_or(false);
            let allowed = if writable {
                let signature = attr_info
                    .get("type")
                    .and_then(Value::as_str)
                    .map(|t| vec![t.to_string()]);
                let call = OperationCall::new(format!("set{}", attr_name), signature, None);
                operation_allowed(document, &name, &call, role)
            } else {
                can_read(document, &name, attr_name, role).allowed
            };
            if let Value::Object(o) = attr_info {
                o.insert("canInvoke".to_string(), Value::Bool(allowed));
            }
            any_member = true;
            any_invokable |= allowed;
        }
    }

    let mbean_allowed = if any_member {
        any_invokable
    } else {
        grants_any(document, &name, role)
    };
    fields.insert("canInvoke".to_string(), Value::Bool(mbean_allowed));
    Value::Object(fields)
}
