//! Header container used by synthesized responses and stub templates.
//!
//! Names are normalized to lowercase on storage so lookups are
//! case-insensitive, and validated against the HTTP token character set.

use crate::error::FetchError;
use crate::pairs::PairList;

/// An ordered header map with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    pairs: PairList,
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(ch)
}

fn normalize(name: &str) -> Result<String, FetchError> {
    if name.is_empty() || !name.chars().all(is_token_char) {
        return Err(FetchError::InvalidHeaderName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header map from (name, value) entries.
    pub fn from_entries<N, V>(
        entries: impl IntoIterator<Item = (N, V)>,
    ) -> Result<Self, FetchError>
    where
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in entries {
            headers.set(name.as_ref(), value)?;
        }
        Ok(headers)
    }

    /// Append a header, keeping existing values for the same name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) -> Result<(), FetchError> {
        let name = normalize(name)?;
        self.pairs.append(name, value);
        Ok(())
    }

    /// Set a header, replacing any existing values for the same name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), FetchError> {
        let name = normalize(name)?;
        self.pairs.set(name, value);
        Ok(())
    }

    /// Remove all values for a header.
    pub fn delete(&mut self, name: &str) {
        if let Ok(name) = normalize(name) {
            self.pairs.delete(&name);
        }
    }

    /// First value for a header, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = normalize(name).ok()?;
        self.pairs.get(&name)
    }

    /// Whether a header is present.
    pub fn has(&self, name: &str) -> bool {
        normalize(name)
            .map(|name| self.pairs.has(&name))
            .unwrap_or(false)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no headers are stored.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate (name, value) entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "application/json").unwrap();

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.has("Content-type"));
    }

    #[test]
    fn test_set_replaces_append_accumulates() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/plain").unwrap();
        headers.append("Accept", "application/json").unwrap();
        assert_eq!(headers.len(), 2);

        headers.set("Accept", "*/*").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept"), Some("*/*"));
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let mut headers = Headers::new();
        let err = headers.set("bad name", "x").unwrap_err();
        assert_eq!(err, FetchError::InvalidHeaderName("bad name".to_string()));

        let err = headers.set("", "x").unwrap_err();
        assert!(matches!(err, FetchError::InvalidHeaderName(_)));
    }

    #[test]
    fn test_from_entries() {
        let headers =
            Headers::from_entries([("Content-Type", "text/plain"), ("X-Count", "3")]).unwrap();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("x-count"), Some("3"));
    }
}
