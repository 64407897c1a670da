// Jolokia request model (single requests and ordered bulk batches)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One Jolokia request as accepted on the wire
///
/// Fields the gateway does not interpret (`config`, `path`, `target`, ...)
/// are kept in `extra` so a forwarded request reaches the agent intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JolokiaRequest {
    Read {
        mbean: String,
        /// A single attribute name, a list of names, or absent for all attributes
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Write {
        mbean: String,
        attribute: String,
        value: Value,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Exec {
        mbean: String,
        /// Operation name, optionally followed by its signature: `name(type,...)`
        operation: String,
        #[serde(default)]
        arguments: Vec<Value>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Search {
        mbean: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Version {
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl JolokiaRequest {
    pub fn read(mbean: impl Into<String>, attribute: Option<&str>) -> Self {
        JolokiaRequest::Read {
            mbean: mbean.into(),
            attribute: attribute.map(|a| Value::String(a.to_string())),
            extra: Map::new(),
        }
    }

    pub fn write(mbean: impl Into<String>, attribute: impl Into<String>, value: Value) -> Self {
        JolokiaRequest::Write {
            mbean: mbean.into(),
            attribute: attribute.into(),
            value,
            extra: Map::new(),
        }
    }

    pub fn exec(mbean: impl Into<String>, operation: impl Into<String>, arguments: Vec<Value>) -> Self {
        JolokiaRequest::Exec {
            mbean: mbean.into(),
            operation: operation.into(),
            arguments,
            extra: Map::new(),
        }
    }

    pub fn search(mbean: impl Into<String>) -> Self {
        JolokiaRequest::Search {
            mbean: mbean.into(),
            extra: Map::new(),
        }
    }

    pub fn list(path: Option<&str>) -> Self {
        JolokiaRequest::List {
            path: path.map(str::to_string),
            extra: Map::new(),
        }
    }

    pub fn version() -> Self {
        JolokiaRequest::Version { extra: Map::new() }
    }

    /// Wire name of the request type
    pub fn kind(&self) -> &'static str {
        match self {
            JolokiaRequest::Read { .. } => "read",
            JolokiaRequest::Write { .. } => "write",
            JolokiaRequest::Exec { .. } => "exec",
            JolokiaRequest::Search { .. } => "search",
            JolokiaRequest::List { .. } => "list",
            JolokiaRequest::Version { .. } => "version",
        }
    }

    /// Target MBean name or pattern, for request types that carry one
    pub fn mbean(&self) -> Option<&str> {
        match self {
            JolokiaRequest::Read { mbean, .. }
            | JolokiaRequest::Write { mbean, .. }
            | JolokiaRequest::Exec { mbean, .. }
            | JolokiaRequest::Search { mbean, .. } => Some(mbean),
            JolokiaRequest::List { .. } | JolokiaRequest::Version { .. } => None,
        }
    }

    /// Structural match of an arbitrary JSON value against a single request
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        // Serializing this enum cannot fail: every field is already a JSON value or string.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A parsed inbound payload: one request, or an ordered bulk batch
#[derive(Debug, Clone, PartialEq)]
pub enum JolokiaPayload {
    Single(JolokiaRequest),
    Bulk(Vec<JolokiaRequest>),
}

impl JolokiaPayload {
    pub fn is_bulk(&self) -> bool {
        matches!(self, JolokiaPayload::Bulk(_))
    }
}
