// ACL policy evaluation - Role checks for Jolokia requests

use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::api::PolicyEngine;
use crate::core::errors::GatewayError;
use crate::core::models::{InterceptionResult, RbacDecision, Role};
use crate::engine::interceptor;
use crate::engine::object_name::ObjectName;
use crate::engine::pattern_matcher::{best_matches, OperationCall};
use crate::loader::AclDocument;
use crate::protocol::JolokiaRequest;

/// Decide one operation call on one MBean
///
/// The most specific selector holding any key that matches the call decides.
/// Among that selector's best matching keys the role needs to be granted by
/// at least one.
pub fn evaluate_call(document: &AclDocument, mbean: &ObjectName, call: &OperationCall<'_>, role: Role) -> RbacDecision {
    for (selector, rules) in document.sections_for(mbean) {
        let winners = best_matches(rules.iter().map(|r| (&r.key, r)), call);
        if winners.is_empty() {
            continue;
        }

        if winners.iter().any(|r| r.grants(role.as_str())) {
            return RbacDecision::allow();
        }

        let keys: Vec<&str> = winners.iter().map(|r| r.key.as_str()).collect();
        return RbacDecision::deny(format!(
            "Role '{}' may not invoke '{}' on '{}' (matched {} {:?})",
            role, call.name, mbean, selector, keys
        ));
    }

    RbacDecision::deny(format!(
        "No ACL rule allows '{}' on '{}' for role '{}'",
        call.name, mbean, role
    ))
}

/// True when any rule applicable to the MBean grants the role
pub fn grants_any(document: &AclDocument, mbean: &ObjectName, role: Role) -> bool {
    document
        .sections_for(mbean)
        .iter()
        .any(|(_, rules)| rules.iter().any(|r| r.grants(role.as_str())))
}

/// Attribute read: granted through either the `get` or the `is` accessor
pub fn can_read(document: &AclDocument, mbean: &ObjectName, attribute: &str, role: Role) -> RbacDecision {
    let getter = evaluate_call(
        document,
        mbean,
        &OperationCall::new(format!("get{}", attribute), Some(Vec::new()), Some(&[])),
        role,
    );
    if getter.allowed {
        return getter;
    }

    let is_getter = evaluate_call(
        document,
        mbean,
        &OperationCall::new(format!("is{}", attribute), Some(Vec::new()), Some(&[])),
        role,
    );
    if is_getter.allowed {
        is_getter
    } else {
        getter
    }
}

/// Check one Jolokia request against the document
pub fn check_request(document: &AclDocument, request: &JolokiaRequest, role: Role) -> RbacDecision {
    let (mbean, name) = match request {
        JolokiaRequest::List { .. } | JolokiaRequest::Version { .. } | JolokiaRequest::Search { .. } => {
            return RbacDecision::allow();
        }
        JolokiaRequest::Read { attribute: None, .. } => return RbacDecision::allow(),
        JolokiaRequest::Read { mbean, .. } | JolokiaRequest::Write { mbean, .. } | JolokiaRequest::Exec { mbean, .. } => {
            match ObjectName::parse(mbean) {
                Ok(name) => (mbean, name),
                Err(e) => return RbacDecision::deny(e),
            }
        }
    };

    let decision = match request {
        JolokiaRequest::Read { attribute: Some(attribute), .. } => {
            let attributes: Vec<&str> = match attribute {
                Value::String(a) => vec![a.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            attributes
                .into_iter()
                .map(|a| can_read(document, &name, a, role))
                .find(|d| !d.allowed)
                .unwrap_or_else(RbacDecision::allow)
        }
        JolokiaRequest::Write { attribute, value, .. } => {
            let value = std::slice::from_ref(value);
            evaluate_call(
                document,
                &name,
                &OperationCall::new(format!("set{}", attribute), None, Some(value)),
                role,
            )
        }
        JolokiaRequest::Exec { operation, arguments, .. } => {
            evaluate_call(document, &name, &OperationCall::parse(operation, Some(arguments.as_slice())), role)
        }
        _ => RbacDecision::allow(),
    };

    if !decision.allowed {
        debug!(mbean = %mbean, kind = request.kind(), role = %role, "ACL denied request");
    }
    decision
}

/// Policy engine backed by an ACL document
///
/// The document is shared read-only by every request; `reload` swaps it
/// wholesale so in-flight requests keep the snapshot they started with.
pub struct AclPolicyEngine {
    document: RwLock<Arc<AclDocument>>,
}

impl AclPolicyEngine {
    pub fn new(document: AclDocument) -> Self {
        Self {
            document: RwLock::new(Arc::new(document)),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        Ok(Self::new(AclDocument::from_file(path)?))
    }

    /// Replace the document
    pub fn reload(&self, document: AclDocument) {
        let mut guard = self.document.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(document);
        info!("RBAC ACL reloaded");
    }

    /// Current document snapshot
    pub fn document(&self) -> Arc<AclDocument> {
        self.document.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PolicyEngine for AclPolicyEngine {
    fn requires_catalog(&self, request: &JolokiaRequest) -> bool {
        interceptor::requires_catalog(request)
    }

    fn check(&self, request: &JolokiaRequest, role: Role) -> RbacDecision {
        check_request(&self.document(), request, role)
    }

    fn intercept(&self, request: JolokiaRequest, role: Role, catalog: &Value) -> InterceptionResult {
        interceptor::intercept(&self.document(), request, role, catalog)
    }
}
