use serde::Serialize;
use std::collections::BTreeMap;

/// Per-record map from structural path to every value found there, in document order.
///
/// Keys iterate in sorted order, like the `QMap` the generated code fills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathValueStore {
    values: BTreeMap<String, Vec<String>>,
}

impl PathValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.entry(path.into()).or_default().push(value.into());
    }

    /// Values at `path`, empty when the path was never seen
    pub fn get(&self, path: &str) -> &[String] {
        self.values.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Values at `path` joined with line breaks
    pub fn join(&self, path: &str) -> String {
        self.get(path).join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct paths
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(path, values)| (path.as_str(), values.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_per_path() {
        let mut store = PathValueStore::new();
        store.append("author", "B. Second");
        store.append("title", "T");
        store.append("author", "A. First");
        assert_eq!(store.get("author"), ["B. Second", "A. First"]);
        assert_eq!(store.join("author"), "B. Second\nA. First");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_path() {
        let store = PathValueStore::new();
        assert!(store.is_empty());
        assert!(store.get("nothing").is_empty());
        assert_eq!(store.join("nothing"), "");
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut store = PathValueStore::new();
        store.append("b", "2");
        store.append("a", "1");
        let paths: Vec<&str> = store.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, ["a", "b"]);
        assert_eq!(serde_json::to_string(&store).unwrap(), r#"{"a":["1"],"b":["2"]}"#);
    }
}
