// ACL document loading - Parse the RBAC ACL YAML into selector rule tables

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::errors::GatewayError;
use crate::engine::object_name::ObjectName;
use crate::engine::pattern_matcher::OperationKey;

/// Selector that applies to every MBean
pub const GLOBAL_SELECTOR: &str = "jmx.acl";

/// Value of the RBAC switch that turns policy evaluation off
pub const RBAC_DISABLED: &str = "disabled";

/// Roles as written in the YAML: `admin`, `admin, viewer` or `[admin, viewer]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RolesYaml {
    One(String),
    Many(Vec<String>),
}

impl RolesYaml {
    fn into_roles(self) -> Vec<String> {
        let raw = match self {
            RolesYaml::One(s) => s.split(',').map(str::to_string).collect(),
            RolesYaml::Many(list) => list,
        };
        raw.into_iter()
            .map(|r| r.trim().to_lowercase())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

type AclYaml = HashMap<String, HashMap<String, RolesYaml>>;

/// One `key: roles` line of a rule table
#[derive(Debug, Clone)]
pub struct AclRule {
    pub key: OperationKey,
    pub roles: Vec<String>,
}

impl AclRule {
    pub fn grants(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Parsed ACL: selector -> rule table
#[derive(Debug, Clone, Default)]
pub struct AclDocument {
    sections: HashMap<String, Vec<AclRule>>,
}

impl AclDocument {
    /// Load and parse an ACL file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let path_ref = path.as_ref();

        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            debug!(path = ?path_ref, error = %e, "ACL read failed");
            GatewayError::Configuration(format!("Failed to read the ACL file at {}", path_ref.display()))
        })?;

        let document = Self::from_yaml_str(&yaml_content).map_err(|e| {
            debug!(path = ?path_ref, error = %e, "ACL parse failed");
            GatewayError::Configuration(format!("Failed to parse the ACL file at {}", path_ref.display()))
        })?;

        info!(
            path = %path_ref.display(),
            sections = document.sections.len(),
            "Loaded RBAC ACL"
        );
        Ok(document)
    }

    /// Parse ACL YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, String> {
        let raw: Option<AclYaml> = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;

        let mut sections = HashMap::new();
        for (selector, table) in raw.unwrap_or_default() {
            if selector != GLOBAL_SELECTOR && !selector.starts_with("jmx.acl.") {
                return Err(format!("Unknown ACL selector '{}'", selector));
            }

            let mut rules = Vec::with_capacity(table.len());
            for (key, roles) in table {
                rules.push(AclRule {
                    key: OperationKey::parse(&key)?,
                    roles: roles.into_roles(),
                });
            }
            sections.insert(selector, rules);
        }

        Ok(Self { sections })
    }

    pub fn section(&self, selector: &str) -> Option<&[AclRule]> {
        self.sections.get(selector).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Selectors that may apply to an MBean, most specific first
    pub fn selectors_for(name: &ObjectName) -> Vec<String> {
        let mut selectors = Vec::with_capacity(name.properties.len() + 2);
        let mut current = format!("{}.{}", GLOBAL_SELECTOR, name.domain);
        selectors.push(current.clone());
        for value in name.property_values() {
            current.push('.');
            current.push_str(value);
            selectors.push(current.clone());
        }
        selectors.reverse();
        selectors.push(GLOBAL_SELECTOR.to_string());
        selectors
    }

    /// Rule tables present in this document for an MBean, most specific first
    pub fn sections_for(&self, name: &ObjectName) -> Vec<(String, &[AclRule])> {
        Self::selectors_for(name)
            .into_iter()
            .filter_map(|s| self.section(&s).map(|rules| (s, rules)))
            .collect()
    }
}

/// Resolve the RBAC switch value into the ACL file to load
///
/// `None` means RBAC is disabled.
pub fn resolve_rbac_acl(default: &Path, value: Option<&str>) -> Option<PathBuf> {
    match value.map(str::trim) {
        None | Some("") => Some(default.to_path_buf()),
        Some(v) if v.eq_ignore_ascii_case(RBAC_DISABLED) => None,
        Some(path) => Some(PathBuf::from(path)),
    }
}
