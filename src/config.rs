//! Declarative stub fixtures.
//!
//! Lets a test suite keep canned routes in a YAML file and register them
//! into a mock engine in one call.

use crate::headers::Headers;
use crate::matcher::{Method, PathPattern};
use crate::outcome::{Body, Outcome, ResponseStub};
use crate::registry::Rule;
use crate::MockFetch;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A fixture file: a set of stub definitions plus an optional base url
/// prepended to exact paths.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StubFile {
    /// Prefix for exact paths. Pattern paths are never prefixed.
    #[serde(default)]
    pub base_url: String,

    /// Stub definitions, registered in file order.
    #[serde(default)]
    pub stubs: Vec<StubDefinition>,
}

impl StubFile {
    /// Load a fixture file from YAML on disk.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a fixture from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let file: Self = serde_yaml::from_str(yaml)?;
        file.validate()?;
        Ok(file)
    }

    /// Validate every stub definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, stub) in self.stubs.iter().enumerate() {
            stub.validate()
                .map_err(|e| anyhow::anyhow!("Stub {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Register every stub into the engine, in file order.
    pub fn apply(&self, engine: &MockFetch) -> anyhow::Result<()> {
        let registry = engine.registry();
        for stub in &self.stubs {
            registry.register(stub.to_rule(&self.base_url)?);
        }
        Ok(())
    }
}

/// A single declarative stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubDefinition {
    /// HTTP method to match.
    pub method: Method,

    /// Path matching
    pub path: PathSpec,

    /// Whether exact-path matching includes the query string.
    #[serde(default = "default_true")]
    pub include_query: bool,

    /// Whether the stub is consumed by its first matching call.
    #[serde(default)]
    pub once: bool,

    /// Outcome for matching calls.
    pub outcome: OutcomeSpec,
}

fn default_true() -> bool {
    true
}

impl StubDefinition {
    /// Validate the stub definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.path.validate()?;
        self.outcome.validate()?;
        Ok(())
    }

    fn to_rule(&self, base_url: &str) -> anyhow::Result<Rule> {
        let path = self.path.to_pattern(base_url)?;
        Ok(Rule::new(
            crate::matcher::Route::new(self.method, path, self.include_query),
            self.once,
            self.outcome.to_outcome()?,
        ))
    }
}

/// Path matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathSpec {
    /// Exact path match
    Exact { value: String },
    /// Regex pattern match
    Pattern { pattern: String },
}

impl PathSpec {
    /// Validate the path spec.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let PathSpec::Pattern { pattern } = self {
            Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid regex: {}", e))?;
        }
        Ok(())
    }

    fn to_pattern(&self, base_url: &str) -> anyhow::Result<PathPattern> {
        match self {
            PathSpec::Exact { value } => Ok(PathPattern::Exact(format!("{base_url}{value}"))),
            PathSpec::Pattern { pattern } => Ok(PathPattern::Pattern(
                Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid regex: {}", e))?,
            )),
        }
    }
}

/// Outcome configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutcomeSpec {
    /// Resolve with a successful status (default 200)
    Resolve {
        #[serde(default)]
        body: Option<BodySpec>,
        #[serde(default = "default_ok_status")]
        status: u16,
        #[serde(default)]
        status_text: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Resolve with a failing status (default 500)
    Fail {
        #[serde(default)]
        body: Option<BodySpec>,
        #[serde(default = "default_fail_status")]
        status: u16,
        #[serde(default)]
        status_text: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Return an error instead of a response
    Throw { message: String },
}

fn default_ok_status() -> u16 {
    200
}

fn default_fail_status() -> u16 {
    500
}

impl OutcomeSpec {
    /// Validate the outcome spec.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            OutcomeSpec::Resolve {
                status,
                body,
                headers,
                ..
            }
            | OutcomeSpec::Fail {
                status,
                body,
                headers,
                ..
            } => {
                if !(100..600).contains(status) {
                    anyhow::bail!("Invalid status code: {}", status);
                }
                if let Some(body) = body {
                    body.to_body()?;
                }
                Headers::from_entries(headers.iter().map(|(k, v)| (k.as_str(), v.clone())))
                    .map_err(|e| anyhow::anyhow!("Invalid header: {}", e))?;
                Ok(())
            }
            OutcomeSpec::Throw { message } => {
                if message.is_empty() {
                    anyhow::bail!("Throw message cannot be empty");
                }
                Ok(())
            }
        }
    }

    fn to_outcome(&self) -> anyhow::Result<Outcome> {
        match self {
            OutcomeSpec::Resolve {
                body,
                status,
                status_text,
                headers,
            } => Ok(Outcome::Resolve(to_stub(
                body,
                *status,
                status_text,
                headers,
            )?)),
            OutcomeSpec::Fail {
                body,
                status,
                status_text,
                headers,
            } => Ok(Outcome::Fail(to_stub(body, *status, status_text, headers)?)),
            OutcomeSpec::Throw { message } => {
                Ok(Outcome::Throw(crate::FetchError::thrown(message.clone())))
            }
        }
    }
}

fn to_stub(
    body: &Option<BodySpec>,
    status: u16,
    status_text: &Option<String>,
    headers: &HashMap<String, String>,
) -> anyhow::Result<ResponseStub> {
    let headers = if headers.is_empty() {
        None
    } else {
        Some(
            Headers::from_entries(headers.iter().map(|(k, v)| (k.as_str(), v.clone())))
                .map_err(|e| anyhow::anyhow!("Invalid header: {}", e))?,
        )
    };
    Ok(ResponseStub {
        body: body.as_ref().map(|b| b.to_body()).transpose()?,
        status: Some(status),
        status_text: status_text.clone(),
        headers,
    })
}

/// Stub body configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodySpec {
    /// Plain text body
    Text { content: String },
    /// JSON body
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
}

impl BodySpec {
    /// Convert to a runtime body value.
    pub fn to_body(&self) -> anyhow::Result<Body> {
        match self {
            BodySpec::Text { content } => Ok(Body::Text(content.clone())),
            BodySpec::Json { content } => Ok(Body::Json(content.clone())),
            BodySpec::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map(Body::Bytes)
                    .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::{FetchInit, SlotTable, DEFAULT_SLOT};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_simple_stub() {
        let yaml = r#"
stubs:
  - method: GET
    path:
      type: exact
      value: /hello
    outcome:
      type: resolve
      body:
        type: text
        content: "Hello, World!"
"#;
        let file = StubFile::from_yaml(yaml).unwrap();
        assert_eq!(file.stubs.len(), 1);
        assert_eq!(file.stubs[0].method, Method::Get);
        assert!(file.stubs[0].include_query);
        assert!(!file.stubs[0].once);
    }

    #[test]
    fn test_parse_json_outcome() {
        let yaml = r#"
base_url: https://api.com/v1
stubs:
  - method: POST
    path:
      type: exact
      value: /apples
    once: true
    outcome:
      type: fail
      status: 404
      body:
        type: json
        content:
          error: not_found
"#;
        let file = StubFile::from_yaml(yaml).unwrap();
        match &file.stubs[0].outcome {
            OutcomeSpec::Fail { status, body, .. } => {
                assert_eq!(*status, 404);
                match body.as_ref().unwrap().to_body().unwrap() {
                    Body::Json(value) => assert_eq!(value["error"], "not_found"),
                    other => panic!("unexpected body: {other:?}"),
                }
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let yaml = r#"
stubs:
  - method: GET
    path:
      type: pattern
      pattern: "("
    outcome:
      type: resolve
"#;
        let err = StubFile::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid regex"));
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let yaml = r#"
stubs:
  - method: GET
    path:
      type: exact
      value: /x
    outcome:
      type: resolve
      status: 42
"#;
        let err = StubFile::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid status code"));
    }

    #[test]
    fn test_base64_body() {
        let spec = BodySpec::Base64 {
            content: "aGVsbG8=".to_string(),
        };
        assert_eq!(spec.to_body().unwrap(), Body::Bytes(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_apply_registers_and_serves() {
        let yaml = r#"
base_url: https://api.com/v1
stubs:
  - method: GET
    path:
      type: exact
      value: /apples
    outcome:
      type: resolve
      body:
        type: json
        content:
          apples: 33
  - method: GET
    path:
      type: exact
      value: /broken
    outcome:
      type: throw
      message: "connection reset"
"#;
        let file = StubFile::from_yaml(yaml).unwrap();
        let engine = MockFetch::new();
        file.apply(&engine).unwrap();

        let target = SlotTable::new();
        engine.install(&target, DEFAULT_SLOT);

        let response = target
            .fetch(DEFAULT_SLOT, "https://api.com/v1/apples", FetchInit::new())
            .await
            .unwrap();
        assert_eq!(response.json().unwrap(), json!({"apples": 33}));

        let err = target
            .fetch(DEFAULT_SLOT, "https://api.com/v1/broken", FetchInit::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_from_file() {
        let yaml = r#"
stubs:
  - method: GET
    path:
      type: exact
      value: /hello
    outcome:
      type: resolve
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loaded = StubFile::from_file(file.path()).unwrap();
        assert_eq!(loaded.stubs.len(), 1);
    }
}
