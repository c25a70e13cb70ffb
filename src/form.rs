//! Multipart-form container for stubbed request and response bodies.

use crate::pairs::PairList;

/// An ordered multipart-form emulation. Field names are case-sensitive and
/// may repeat; `get_all` returns every value appended under a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: PairList,
}

impl FormData {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.append(name, value);
    }

    /// Set a field, replacing any existing values for the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.set(name, value);
    }

    /// Remove all values for a field.
    pub fn delete(&mut self, name: &str) {
        self.pairs.delete(name);
    }

    /// First value for a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.get(name)
    }

    /// All values for a field, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs.get_all(name)
    }

    /// Whether a field is present.
    pub fn has(&self, name: &str) -> bool {
        self.pairs.has(name)
    }

    /// Whether the form holds no fields.
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
    fn test_get_all_returns_repeated_fields() {
        let mut form = FormData::new();
        form.append("tag", "red");
        form.append("tag", "blue");
        form.append("name", "apple");

        assert_eq!(form.get_all("tag"), vec!["red", "blue"]);
        assert_eq!(form.get("tag"), Some("red"));
        assert_eq!(form.get_all("missing"), Vec::<&str>::new());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut form = FormData::new();
        form.append("Name", "apple");

        assert!(form.has("Name"));
        assert!(!form.has("name"));
    }
}
