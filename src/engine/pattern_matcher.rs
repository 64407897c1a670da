// ACL operation-key parsing and matching against operation calls

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// How closely a key matched a call; higher wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    /// `prefix*`, ranked by prefix length
    Wildcard(usize),
    /// `name`
    Name,
    /// `name(sig)`
    Signature,
    /// `name(sig)[args]`
    Arguments,
}

/// One argument constraint of an argument-constrained key
#[derive(Debug, Clone)]
pub enum ArgMatcher {
    Exact(String),
    /// Anchored regex
    Pattern(Regex),
}

impl ArgMatcher {
    fn matches(&self, value: &Value) -> bool {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        match self {
            ArgMatcher::Exact(expected) => *expected == text,
            ArgMatcher::Pattern(re) => re.is_match(&text),
        }
    }
}

impl PartialEq for ArgMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgMatcher::Exact(a), ArgMatcher::Exact(b)) => a == b,
            (ArgMatcher::Pattern(a), ArgMatcher::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NamePattern {
    Exact(String),
    Prefix(String),
}

/// A parsed rule key from an ACL rule table
#[derive(Debug, Clone, PartialEq)]
pub struct OperationKey {
    raw: String,
    name: NamePattern,
    signature: Option<Vec<String>>,
    arguments: Option<Vec<ArgMatcher>>,
}

impl OperationKey {
    /// Parse `name`, `name(sig)`, `name(sig)[args]` or `prefix*`
    pub fn parse(raw: &str) -> Result<Self, String> {
        let key = raw.trim();
        if key.is_empty() {
            return Err("Empty operation key".to_string());
        }

        if let Some(prefix) = key.strip_suffix('*') {
            if !prefix.contains(['(', '[']) {
                return Ok(Self {
                    raw: key.to_string(),
                    name: NamePattern::Prefix(prefix.to_string()),
                    signature: None,
                    arguments: None,
                });
            }
        }

        let name_end = key.find(['(', '[']).unwrap_or(key.len());
        let name = &key[..name_end];
        if name.is_empty() {
            return Err(format!("Operation key '{}' has no name", key));
        }
        let mut rest = &key[name_end..];

        let mut signature = None;
        if let Some(after_paren) = rest.strip_prefix('(') {
            let close = after_paren
                .find(')')
                .ok_or_else(|| format!("Operation key '{}' has an unclosed signature", key))?;
            signature = Some(split_signature(&after_paren[..close]));
            rest = &after_paren[close + 1..];
        }

        let mut arguments = None;
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let inner = after_bracket
                .strip_suffix(']')
                .ok_or_else(|| format!("Operation key '{}' has an unclosed argument list", key))?;
            arguments = Some(parse_arguments(inner).map_err(|e| format!("Operation key '{}': {}", key, e))?);
            rest = "";
        }

        if !rest.is_empty() {
            return Err(format!("Operation key '{}' has trailing characters '{}'", key, rest));
        }

        Ok(Self {
            raw: key.to_string(),
            name: NamePattern::Exact(name.to_string()),
            signature,
            arguments,
        })
    }

    /// The key as written in the ACL
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match against a call; `None` when the key does not apply
    ///
    /// A call with unknown signature or arguments (a `canInvoke` style
    /// question) is matched by keys constraining them, since some invocation
    /// could satisfy the key.
    pub fn matches(&self, call: &OperationCall<'_>) -> Option<Specificity> {
        let name = match &self.name {
            NamePattern::Prefix(prefix) => {
                return call.name.starts_with(prefix.as_str()).then_some(Specificity::Wildcard(prefix.len()));
            }
            NamePattern::Exact(name) => name,
        };

        if *name != call.name {
            return None;
        }

        if let (Some(expected), Some(actual)) = (&self.signature, &call.signature) {
            if expected != actual {
                return None;
            }
        }

        if let (Some(matchers), Some(actual)) = (&self.arguments, call.arguments) {
            if matchers.len() != actual.len() || !matchers.iter().zip(actual).all(|(m, v)| m.matches(v)) {
                return None;
            }
        }

        Some(if self.arguments.is_some() {
            Specificity::Arguments
        } else if self.signature.is_some() {
            Specificity::Signature
        } else {
            Specificity::Name
        })
    }
}

/// An operation being checked: `gc()`, `setVerbose` with a value, ...
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCall<'a> {
    pub name: String,
    /// `None` when the caller did not state a signature
    pub signature: Option<Vec<String>>,
    /// `None` when the arguments are not known
    pub arguments: Option<&'a [Value]>,
}

impl<'a> OperationCall<'a> {
    /// Parse a Jolokia operation string, `name` or `name(type,...)`
    pub fn parse(operation: &str, arguments: Option<&'a [Value]>) -> Self {
        let operation = operation.trim();
        match operation.find('(') {
            Some(open) => {
                let inner = operation[open + 1..].trim_end_matches(')');
                Self {
                    name: operation[..open].to_string(),
                    signature: Some(split_signature(inner)),
                    arguments,
                }
            }
            None => Self {
                name: operation.to_string(),
                signature: None,
                arguments,
            },
        }
    }

    pub fn new(name: impl Into<String>, signature: Option<Vec<String>>, arguments: Option<&'a [Value]>) -> Self {
        Self {
            name: name.into(),
            signature,
            arguments,
        }
    }
}

/// Pick the highest specificity among matching keys, keeping every tie
pub fn best_matches<'k, T>(
    entries: impl IntoIterator<Item = (&'k OperationKey, T)>,
    call: &OperationCall<'_>,
) -> Vec<T> {
    let mut best: Option<Specificity> = None;
    let mut winners = Vec::new();

    for (key, item) in entries {
        let Some(spec) = key.matches(call) else { continue };
        match best.map(|b| spec.cmp(&b)) {
            None | Some(Ordering::Greater) => {
                best = Some(spec);
                winners.clear();
                winners.push(item);
            }
            Some(Ordering::Equal) => winners.push(item),
            Some(Ordering::Less) => {}
        }
    }
    winners
}

fn split_signature(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_arguments(inner: &str) -> Result<Vec<ArgMatcher>, String> {
    let mut matchers = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(open) = chars.next() else { break };
        let close = match open {
            '"' => '"',
            '/' => '/',
            other => return Err(format!("unexpected '{}' in argument list", other)),
        };

        let mut literal = String::new();
        let mut terminated = false;
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some(next) if next == close => literal.push(next),
                    Some(next) => {
                        literal.push('\\');
                        literal.push(next);
                    }
                    None => literal.push('\\'),
                }
            } else if c == close {
                terminated = true;
                break;
            } else {
                literal.push(c);
            }
        }
        if !terminated {
            return Err("unterminated argument".to_string());
        }

        matchers.push(if close == '"' {
            ArgMatcher::Exact(literal)
        } else {
            let anchored = format!("^(?:{})$", literal);
            ArgMatcher::Pattern(Regex::new(&anchored).map_err(|e| format!("invalid regex /{}/: {}", literal, e))?)
        });

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') | None => {}
            Some(other) => return Err(format!("expected ',' but found '{}'", other)),
        }
    }

    Ok(matchers)
}
