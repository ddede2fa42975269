use serde_json::{Map, Value};

/// Insertion-ordered JSON document builder that quietly drops null and empty
/// values instead of writing them.
///
/// The wire contract wants absent fields to be absent, never `null` or `""`.
/// Routing every insert through this builder keeps that invariant in one
/// place instead of scattering `if let Some(...)` checks through the mapper.
#[derive(Debug, Default)]
pub(crate) struct DocumentBuilder {
    map: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key` unless the value is null, an empty string
    /// (after trimming), an empty object or an empty array.
    pub fn insert(&mut self, key: &str, value: Value) -> &mut Self {
        if Self::is_present(&value) {
            self.map.insert(key.to_string(), value);
        }
        self
    }

    /// Insert an optional string, skipping `None` and blanks.
    pub fn insert_text(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(text) = value {
            self.insert(key, Value::String(text.to_string()));
        }
        self
    }

    /// Insert an optional bool.
    pub fn insert_bool(&mut self, key: &str, value: Option<bool>) -> &mut Self {
        if let Some(b) = value {
            self.insert(key, Value::Bool(b));
        }
        self
    }

    /// Insert an optional float, skipping non-finite values (JSON has no
    /// representation for them).
    pub fn insert_f64(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        if let Some(n) = value {
            if let Some(number) = serde_json::Number::from_f64(n) {
                self.insert(key, Value::Number(number));
            }
        }
        self
    }

    /// Insert a nested document, skipping empty ones.
    pub fn insert_document(&mut self, key: &str, document: Map<String, Value>) -> &mut Self {
        self.insert(key, Value::Object(document))
    }

    pub fn build(self) -> Map<String, Value> {
        self.map
    }

    fn is_present(value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }
}
