// Spec Documents - schemaless resource payloads
// A spec document is the untyped `spec` portion of a generic resource. Values are
// serde_json values (one variant per JSON kind); every accessor here is fallible
// and returns None when the key is missing OR holds a value of another kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `spec` payload of a generic resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecDocument {
    inner: Map<String, Value>,
}

impl SpecDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.inner
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Set a key, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    /// Integer accessor. Floats and numeric strings are not coerced.
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.inner.get(key).and_then(Value::as_i64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.inner.get(key).and_then(Value::as_bool)
    }

    /// String list accessor. Non-string elements are skipped.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.inner.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.inner.get(key).and_then(Value::as_object)
    }

    pub fn array(&self, key: &str) -> Option<&Vec<Value>> {
        self.inner.get(key).and_then(Value::as_array)
    }

    /// Nested sub-document, when the key holds an object
    pub fn document(&self, key: &str) -> Option<SpecDocument> {
        self.object(key).cloned().map(SpecDocument::from_map)
    }

    /// Resolve a dotted path (`source.name`) through nested objects
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.inner.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl From<SpecDocument> for Value {
    fn from(doc: SpecDocument) -> Self {
        Value::Object(doc.inner)
    }
}

/// Read a string field from a raw JSON object with the same leniency as `SpecDocument`
pub fn object_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

/// Render a scalar JSON value the way field selectors compare it
pub fn selector_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> SpecDocument {
        match value {
            Value::Object(map) => SpecDocument::from_map(map),
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_typed_accessors_treat_wrong_kind_as_absent() {
        let spec = doc(json!({
            "text": 42,
            "time": "1000",
            "tags": "not-a-list",
            "timeEnd": 2.5,
        }));

        assert_eq!(spec.str("text"), None);
        assert_eq!(spec.i64("time"), None);
        assert_eq!(spec.string_list("tags"), None);
        assert_eq!(spec.i64("timeEnd"), None);
        assert_eq!(spec.str("missing"), None);
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let spec = doc(json!({"tags": ["a", 1, null, "b"]}));
        assert_eq!(spec.string_list("tags"), Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_lookup_nested_path() {
        let spec = doc(json!({"source": {"name": "ds-1", "group": "loki"}}));
        assert_eq!(spec.lookup("source.name"), Some(&json!("ds-1")));
        assert_eq!(spec.lookup("source.missing"), None);
        assert_eq!(spec.lookup("source.name.deeper"), None);
    }

    #[test]
    fn test_selector_text() {
        assert_eq!(selector_text(&json!("x")), Some("x".to_string()));
        assert_eq!(selector_text(&json!(12)), Some("12".to_string()));
        assert_eq!(selector_text(&json!(true)), Some("true".to_string()));
        assert_eq!(selector_text(&json!([1])), None);
    }
}
