use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::FieldSchema;

/// In-progress answers for one session, keyed by field identifier.
///
/// Absent and empty values are equivalent: every lookup yields a string, never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    values: BTreeMap<String, String>,
}

impl Draft {
    /// Creates a draft with every schema field present and empty.
    pub fn for_schema(schema: &FieldSchema) -> Self {
        let values = schema
            .field_ids()
            .map(|id| (id.to_string(), String::new()))
            .collect();
        Self { values }
    }

    pub fn get(&self, id: &str) -> &str {
        self.values.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(id.into(), value.into());
    }

    /// True when no field holds a non-empty value.
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn into_values(self) -> BTreeMap<String, String> {
        self.values
    }
}

impl<K, V> FromIterator<(K, V)> for Draft
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_empty() {
        let draft = Draft::default();
        assert_eq!(draft.get("firstName"), "");
        assert!(draft.is_blank());
    }

    #[test]
    fn schema_draft_starts_with_every_field_empty() {
        let schema = FieldSchema::admission(2025);
        let mut draft = Draft::for_schema(&schema);
        assert_eq!(draft.iter().count(), schema.field_ids().count());
        assert!(draft.is_blank());
        draft.set("firstName", "Ada");
        assert_eq!(draft.get("firstName"), "Ada");
        assert!(!draft.is_blank());
    }

    #[test]
    fn serializes_as_flat_object() {
        let draft: Draft = [("email", "a@b.co")].into_iter().collect();
        let json = serde_json::to_string(&draft).expect("serialize");
        assert_eq!(json, r#"{"email":"a@b.co"}"#);
    }
}
