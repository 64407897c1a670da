// MBean ObjectName parsing (`domain:key=value,key=value`)

use std::fmt;

/// A parsed MBean ObjectName, keeping property declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub domain: String,
    pub properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Parse `domain:k1=v1,k2="v,2"`; quoted values may contain commas
    pub fn parse(name: &str) -> Result<Self, String> {
        let (domain, props) = name
            .split_once(':')
            .ok_or_else(|| format!("Invalid MBean name '{}': missing ':'", name))?;

        if domain.is_empty() {
            return Err(format!("Invalid MBean name '{}': empty domain", name));
        }

        let mut properties = Vec::new();
        for entry in split_properties(props) {
            if entry == "*" {
                // Property list pattern marker, carries no key
                continue;
            }
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid MBean name '{}': property '{}' has no value", name, entry))?;
            if key.is_empty() {
                return Err(format!("Invalid MBean name '{}': empty property key", name));
            }
            properties.push((key.to_string(), value.to_string()));
        }

        Ok(Self {
            domain: domain.to_string(),
            properties,
        })
    }

    /// Property values in declaration order, with surrounding quotes removed
    pub fn property_values(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(_, v)| unquote(v))
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (k, v)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn split_properties(props: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in props.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&props[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&props[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}
