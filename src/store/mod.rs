//! Durable persistence for the in-progress draft and the last submission.
//!
//! Backends only deal in string keys and string values; [`DraftStore`] owns the key
//! names and the JSON encoding layered on top of them.

pub mod json_file;
pub mod memory;

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;

use crate::{draft::Draft, errors::Result, submission::SubmissionRecord};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

pub const DRAFT_KEY: &str = "admissionFormData";
pub const CURRENT_STEP_KEY: &str = "admissionCurrentStep";
pub const COMPLETED_STEPS_KEY: &str = "admissionCompletedSteps";
pub const SUBMISSION_KEY: &str = "admissionSubmission";

/// Abstraction over string key/value storage backends.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Whatever was found in the store; every part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedDraft {
    pub draft: Option<Draft>,
    pub current_step: Option<usize>,
    pub completed_steps: Option<BTreeSet<usize>>,
}

impl PersistedDraft {
    pub fn is_empty(&self) -> bool {
        self.draft.is_none() && self.current_step.is_none() && self.completed_steps.is_none()
    }
}

/// Reads and writes the wizard's persisted keys through a [`KeyValueStore`].
pub struct DraftStore {
    backend: Box<dyn KeyValueStore>,
}

impl DraftStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Loads all three draft keys. Values that fail to decode are reported as absent.
    pub fn load(&self) -> Result<PersistedDraft> {
        Ok(PersistedDraft {
            draft: self.read_json(DRAFT_KEY)?,
            current_step: self.read_step()?,
            completed_steps: self.read_json(COMPLETED_STEPS_KEY)?,
        })
    }

    pub fn save(
        &mut self,
        draft: &Draft,
        current_step: usize,
        completed_steps: &BTreeSet<usize>,
    ) -> Result<()> {
        self.backend.set(DRAFT_KEY, &serde_json::to_string(draft)?)?;
        self.backend
            .set(CURRENT_STEP_KEY, &current_step.to_string())?;
        self.backend
            .set(COMPLETED_STEPS_KEY, &serde_json::to_string(completed_steps)?)?;
        Ok(())
    }

    /// Removes the draft keys. The last submission is left in place.
    pub fn clear(&mut self) -> Result<()> {
        self.backend.remove(DRAFT_KEY)?;
        self.backend.remove(CURRENT_STEP_KEY)?;
        self.backend.remove(COMPLETED_STEPS_KEY)?;
        Ok(())
    }

    pub fn save_submission(&mut self, record: &SubmissionRecord) -> Result<()> {
        self.backend
            .set(SUBMISSION_KEY, &serde_json::to_string(record)?)
    }

    pub fn last_submission(&self) -> Result<Option<SubmissionRecord>> {
        self.read_json(SUBMISSION_KEY)
    }

    fn read_step(&self) -> Result<Option<usize>> {
        let Some(raw) = self.backend.get(CURRENT_STEP_KEY)? else {
            return Ok(None);
        };
        match raw.trim().parse::<usize>() {
            Ok(step) => Ok(Some(step)),
            Err(err) => {
                tracing::warn!(key = CURRENT_STEP_KEY, %err, "ignoring malformed persisted value");
                Ok(None)
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, %err, "ignoring malformed persisted value");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str)]) -> DraftStore {
        let mut backend = MemoryStore::new();
        for (key, value) in entries {
            backend.set(key, value).expect("seed");
        }
        DraftStore::new(Box::new(backend))
    }

    #[test]
    fn first_run_loads_nothing() {
        let store = store_with(&[]);
        let loaded = store.load().expect("load");
        assert!(loaded.is_empty());
        assert!(store.last_submission().expect("submission").is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = store_with(&[]);
        let draft: Draft = [("firstName", "Ada"), ("gpa", "3.9")].into_iter().collect();
        let completed: BTreeSet<usize> = [1, 2].into_iter().collect();

        store.save(&draft, 3, &completed).expect("save");
        let loaded = store.load().expect("load");

        assert_eq!(loaded.draft, Some(draft));
        assert_eq!(loaded.current_step, Some(3));
        assert_eq!(loaded.completed_steps, Some(completed));
    }

    #[test]
    fn corrupt_values_read_as_absent() {
        let store = store_with(&[
            (DRAFT_KEY, "{not json"),
            (CURRENT_STEP_KEY, "three"),
            (COMPLETED_STEPS_KEY, "[1, \"two\"]"),
        ]);
        let loaded = store.load().expect("load");
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_key_does_not_hide_healthy_ones() {
        let store = store_with(&[(DRAFT_KEY, "oops"), (CURRENT_STEP_KEY, "2")]);
        let loaded = store.load().expect("load");
        assert!(loaded.draft.is_none());
        assert_eq!(loaded.current_step, Some(2));
    }

    #[test]
    fn clear_keeps_submission_key() {
        let mut store = store_with(&[(SUBMISSION_KEY, "{}")]);
        store
            .save(&Draft::default(), 1, &BTreeSet::new())
            .expect("save");
        store.clear().expect("clear");

        assert!(store.load().expect("load").is_empty());
        assert!(store.backend.get(SUBMISSION_KEY).expect("get").is_some());
    }

    struct ReadOnlyBackend;

    impl KeyValueStore for ReadOnlyBackend {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<()> {
            Err(crate::errors::WizardError::Storage(format!("`{}` is read-only", key)))
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            Err(crate::errors::WizardError::Storage(format!("`{}` is read-only", key)))
        }
    }

    #[test]
    fn backend_failures_surface_as_storage_errors() {
        let mut store = DraftStore::new(Box::new(ReadOnlyBackend));
        let err = store
            .save(&Draft::default(), 1, &BTreeSet::new())
            .expect_err("write should fail");
        assert!(matches!(err, crate::errors::WizardError::Storage(_)));
        assert!(store.clear().is_err());
    }
}
