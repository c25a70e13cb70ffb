//! Route matching.
//!
//! Decides whether a concrete (method, URL) pair satisfies a registered
//! route's (method, path pattern, include-query) triple.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The verb set routes can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    /// Uppercase wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PATCH" => Ok(Method::Patch),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// A route's path: an exact string or a regex pattern.
///
/// Base-url prefixing applies to exact strings only, and happens when the
/// route is created, never here.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Match the URL by string equality.
    Exact(String),
    /// Match the URL by regex test.
    Pattern(Regex),
}

impl PathPattern {
    /// The literal value identifying this pattern for replacement and
    /// clearing: the string itself, or the regex source. Two regexes are
    /// the same key iff their sources are byte-equal.
    pub fn key(&self) -> &str {
        match self {
            PathPattern::Exact(path) => path,
            PathPattern::Pattern(regex) => regex.as_str(),
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PathPattern::Exact(_), PathPattern::Exact(_))
            | (PathPattern::Pattern(_), PathPattern::Pattern(_)) => self.key() == other.key(),
            _ => false,
        }
    }
}

impl From<&str> for PathPattern {
    fn from(path: &str) -> Self {
        PathPattern::Exact(path.to_string())
    }
}

impl From<String> for PathPattern {
    fn from(path: String) -> Self {
        PathPattern::Exact(path)
    }
}

impl From<Regex> for PathPattern {
    fn from(regex: Regex) -> Self {
        PathPattern::Pattern(regex)
    }
}

/// A (method, path pattern, include-query) triple identifying which
/// intercepted calls a rule applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    pub path: PathPattern,
    pub include_query: bool,
}

impl Route {
    pub fn new(method: Method, path: impl Into<PathPattern>, include_query: bool) -> Self {
        Self {
            method,
            path: path.into(),
            include_query,
        }
    }

    /// Whether a concrete call satisfies this route.
    ///
    /// Exact patterns with `include_query == false` compare against the URL
    /// with everything from the first `?` stripped. Regex patterns always
    /// test against the full URL, query included, whatever `include_query`
    /// says. That asymmetry is a documented quirk of the matching contract
    /// and is relied upon by callers; do not fold the query stripping into
    /// the regex arm.
    pub fn matches(&self, method: Method, url: &str) -> bool {
        if self.method != method {
            return false;
        }
        match &self.path {
            PathPattern::Exact(path) => {
                let effective_url = if self.include_query {
                    url
                } else {
                    url.split('?').next().unwrap_or(url)
                };
                path == effective_url
            }
            PathPattern::Pattern(regex) => regex.is_match(url),
        }
    }

    /// Whether another route names the same (method, pattern) key.
    /// Used for standing-rule replacement and clearing.
    pub fn same_key(&self, method: Method, path: &PathPattern) -> bool {
        self.method == method && self.path == *path
    }
}

/// A URL split into path and query, handed to compute callbacks.
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    raw: String,
    path: String,
    query: HashMap<String, String>,
}

impl ParsedUrl {
    /// Split a URL at the first `?` and decode its query parameters.
    pub fn parse(url: &str) -> Self {
        let (path, query_string) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        Self {
            raw: url.to_string(),
            path: path.to_string(),
            query: parse_query_string(query_string.unwrap_or("")),
        }
    }

    /// The full URL as the caller passed it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The URL up to the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded value of a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// All decoded query parameters.
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }
}

/// Parse a query string into key-value pairs.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        if let Some((key, value)) = part.split_once('=') {
            params.insert(urlencoding_decode(key), urlencoding_decode(value));
        } else {
            params.insert(urlencoding_decode(part), String::new());
        }
    }

    params
}

/// Simple URL decoding.
fn urlencoding_decode(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else if ch == '+' {
            result.push(' ');
        } else {
            result.push(ch);
        }
    }

    result
}
