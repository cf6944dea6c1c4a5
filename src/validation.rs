use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{draft::Draft, schema::FieldSchema};

/// Per-field error messages produced by one validation pass.
///
/// A field with no entry is valid. Results are recomputed from scratch on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, id: &str) -> Option<&str> {
        self.errors.get(id).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn insert(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(id.into(), message.into());
    }

    /// Drops the error recorded for `id`, returning whether one existed.
    pub(crate) fn clear_field(&mut self, id: &str) -> bool {
        self.errors.remove(id).is_some()
    }
}

/// Runs every rule of every field in `step` against `draft`.
///
/// Each field reports only its first failing rule, but all fields of the step are
/// checked. The review step, and any step outside the schema, validate trivially.
pub fn validate_step(schema: &FieldSchema, step: usize, draft: &Draft) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for field in schema.fields_in_step(step) {
        let value = draft.get(&field.id);
        if let Some(message) = field
            .rules
            .iter()
            .find_map(|rule| rule.check(value, draft).err())
        {
            result.insert(field.id.clone(), message);
        }
    }
    result
}
