use serde::Deserialize;

/// A stored document as returned by the facade: its id within the parent
/// collection plus untyped JSON fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// String value of a field, `None` if absent, null, or not a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
}
