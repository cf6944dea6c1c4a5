//! Wizard controller: owns the draft, the visible step and the completed-step set,
//! and keeps them in sync with the [`DraftStore`].
//!
//! Validation failures are returned as data, never as errors. Store failures are
//! downgraded to [`StoreWarning`]s so the user can keep filling in the form even when
//! persistence is unavailable.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use crate::{
    draft::Draft,
    errors::{Result, WizardError},
    schema::FieldSchema,
    store::{DraftStore, PersistedDraft},
    submission::{SubmissionBuilder, SubmissionRecord, DEFAULT_REFERENCE_PREFIX},
    time::Clock,
    validation::{validate_step, ValidationResult},
};

/// A session shared with the autosave task.
pub type SharedSession = Arc<Mutex<WizardSession>>;

/// Visible step plus the steps whose validation has passed at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    current_step: usize,
    completed_steps: BTreeSet<usize>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: 1,
            completed_steps: BTreeSet::new(),
        }
    }
}

impl WizardState {
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn completed_steps(&self) -> &BTreeSet<usize> {
        &self.completed_steps
    }

    pub fn is_completed(&self, step: usize) -> bool {
        self.completed_steps.contains(&step)
    }
}

/// Progress indicator state for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    NotStarted,
    Active,
    Completed,
}

/// A persistence failure that was absorbed so the session could continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWarning {
    pub operation: &'static str,
    pub message: String,
}

/// Outcome of [`WizardSession::next`].
#[derive(Debug, Clone)]
pub struct StepReport {
    pub validation: ValidationResult,
    pub state: WizardState,
    pub warning: Option<StoreWarning>,
}

impl StepReport {
    pub fn accepted(&self) -> bool {
        self.validation.is_valid()
    }
}

/// Outcome of [`WizardSession::previous`] and [`WizardSession::go_to`].
#[derive(Debug, Clone)]
pub struct NavigationReport {
    pub moved: bool,
    pub state: WizardState,
    pub warning: Option<StoreWarning>,
}

/// Outcome of [`WizardSession::submit`].
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Submitted {
        record: SubmissionRecord,
        warnings: Vec<StoreWarning>,
    },
    /// The record could not be written. The draft and progress are kept, in memory
    /// and in the store, so the application can be submitted again.
    NotStored {
        record: SubmissionRecord,
        warnings: Vec<StoreWarning>,
    },
    Rejected(ValidationResult),
}

pub struct WizardSession {
    schema: Arc<FieldSchema>,
    store: DraftStore,
    clock: Arc<dyn Clock>,
    reference_prefix: String,
    draft: Draft,
    state: WizardState,
    errors: ValidationResult,
    last_warning: Option<StoreWarning>,
}

impl WizardSession {
    /// Opens a session, hydrating draft and progress from `store` when present.
    ///
    /// Unreadable stores and out-of-range persisted steps fall back to a fresh session.
    pub fn start(schema: Arc<FieldSchema>, store: DraftStore, clock: Arc<dyn Clock>) -> Self {
        let mut session = Self {
            draft: Draft::for_schema(&schema),
            schema,
            store,
            clock,
            reference_prefix: DEFAULT_REFERENCE_PREFIX.into(),
            state: WizardState::default(),
            errors: ValidationResult::valid(),
            last_warning: None,
        };
        let loaded = session.store.load();
        if let Ok(persisted) = session.absorb("load", loaded) {
            session.hydrate(persisted);
        }
        session
    }

    pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = prefix.into();
        self
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    fn hydrate(&mut self, persisted: PersistedDraft) {
        if let Some(saved) = persisted.draft {
            for (id, value) in saved.iter() {
                if self.schema.field(id).is_some() {
                    self.draft.set(id, value);
                } else {
                    tracing::debug!(field = id, "dropping persisted value for unknown field");
                }
            }
        }
        if let Some(step) = persisted.current_step {
            if self.schema.contains_step(step) {
                self.state.current_step = step;
            } else {
                tracing::warn!(step, "persisted step out of range, starting at step 1");
            }
        }
        if let Some(mut completed) = persisted.completed_steps {
            completed.retain(|step| self.schema.contains_step(*step));
            self.state.completed_steps = completed;
        }
        tracing::debug!(
            step = self.state.current_step,
            completed = ?self.state.completed_steps,
            "session hydrated"
        );
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn is_review_step(&self) -> bool {
        self.state.current_step == self.schema.review_step()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn value(&self, id: &str) -> &str {
        self.draft.get(id)
    }

    /// Errors currently shown to the user.
    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn last_store_warning(&self) -> Option<&StoreWarning> {
        self.last_warning.as_ref()
    }

    /// Writes a field value and clears that field's visible error.
    pub fn set_field(&mut self, id: &str, value: impl Into<String>) -> Result<()> {
        if self.schema.field(id).is_none() {
            return Err(WizardError::UnknownField(id.to_string()));
        }
        self.draft.set(id, value);
        self.errors.clear_field(id);
        Ok(())
    }

    /// Validates the current step; on success marks it complete and advances unless
    /// already on the review step.
    pub fn next(&mut self) -> StepReport {
        let step = self.state.current_step;
        let validation = validate_step(&self.schema, step, &self.draft);
        if !validation.is_valid() {
            tracing::debug!(step, errors = validation.len(), "step rejected");
            self.errors = validation.clone();
            return StepReport {
                validation,
                state: self.state.clone(),
                warning: None,
            };
        }

        self.errors = ValidationResult::valid();
        self.state.completed_steps.insert(step);
        if step < self.schema.step_count() {
            self.state.current_step = step + 1;
        }
        tracing::debug!(from = step, to = self.state.current_step, "step accepted");
        let warning = self.persist("save");
        StepReport {
            validation,
            state: self.state.clone(),
            warning,
        }
    }

    /// Moves back one step without validating.
    pub fn previous(&mut self) -> NavigationReport {
        if self.state.current_step <= 1 {
            return self.navigation_report(false, None);
        }
        self.state.current_step -= 1;
        let warning = self.persist("save");
        self.navigation_report(true, warning)
    }

    /// Jumps to any step in range without validating or completing skipped steps.
    pub fn go_to(&mut self, step: usize) -> NavigationReport {
        if !self.schema.contains_step(step) {
            tracing::debug!(step, "ignoring jump to step outside the schema");
            return self.navigation_report(false, None);
        }
        let moved = self.state.current_step != step;
        self.state.current_step = step;
        let warning = self.persist("save");
        self.navigation_report(moved, warning)
    }

    /// Validates the current step and, on success, freezes the draft into a record,
    /// persists it, clears the stored draft and starts a fresh in-memory session.
    /// When the record cannot be stored nothing is cleared.
    ///
    /// The current step is not required to be the review step.
    pub fn submit(&mut self) -> SubmitOutcome {
        let step = self.state.current_step;
        let validation = validate_step(&self.schema, step, &self.draft);
        if !validation.is_valid() {
            tracing::debug!(step, errors = validation.len(), "submission rejected");
            self.errors = validation.clone();
            return SubmitOutcome::Rejected(validation);
        }

        self.state.completed_steps.insert(step);
        let record = SubmissionBuilder::new(self.clock.as_ref())
            .with_prefix(&self.reference_prefix)
            .build(&self.draft);

        let saved = self.store.save_submission(&record);
        if let Err(warning) = self.absorb("save_submission", saved) {
            let mut warnings = vec![warning];
            warnings.extend(self.persist("save"));
            tracing::warn!(
                reference = record.reference(),
                "submission not stored, keeping the draft"
            );
            return SubmitOutcome::NotStored { record, warnings };
        }

        let cleared = self.store.clear();
        let warnings = self.absorb("clear", cleared).err().into_iter().collect();
        self.discard_in_memory();
        tracing::info!(reference = record.reference(), "application submitted");
        SubmitOutcome::Submitted { record, warnings }
    }

    /// Explicit manual save.
    pub fn save_draft(&mut self) -> Option<StoreWarning> {
        self.persist("save")
    }

    /// Periodic flush; does nothing while the session holds no answers or progress.
    pub fn flush(&mut self) -> Option<StoreWarning> {
        if self.is_pristine() {
            return None;
        }
        self.persist("autosave")
    }

    /// Discards the draft and progress both in memory and in the store.
    pub fn reset(&mut self) -> Option<StoreWarning> {
        self.discard_in_memory();
        let cleared = self.store.clear();
        self.absorb("clear", cleared).err()
    }

    pub fn is_pristine(&self) -> bool {
        self.draft.is_blank() && self.state == WizardState::default()
    }

    /// Per-step indicator; a completed step shows as completed even while active.
    pub fn progress(&self) -> Vec<StepStatus> {
        (1..=self.schema.step_count())
            .map(|step| self.status_of(step))
            .collect()
    }

    pub fn status_of(&self, step: usize) -> StepStatus {
        if self.state.is_completed(step) {
            StepStatus::Completed
        } else if step == self.state.current_step {
            StepStatus::Active
        } else {
            StepStatus::NotStarted
        }
    }

    /// Most recent submission, which outlives the draft.
    pub fn last_submission(&mut self) -> Option<SubmissionRecord> {
        let loaded = self.store.last_submission();
        self.absorb("load_submission", loaded).ok().flatten()
    }

    fn discard_in_memory(&mut self) {
        self.draft = Draft::for_schema(&self.schema);
        self.state = WizardState::default();
        self.errors = ValidationResult::valid();
    }

    fn navigation_report(&self, moved: bool, warning: Option<StoreWarning>) -> NavigationReport {
        NavigationReport {
            moved,
            state: self.state.clone(),
            warning,
        }
    }

    fn persist(&mut self, operation: &'static str) -> Option<StoreWarning> {
        let saved = self.store.save(
            &self.draft,
            self.state.current_step,
            &self.state.completed_steps,
        );
        self.absorb(operation, saved).err()
    }

    fn absorb<T>(
        &mut self,
        operation: &'static str,
        result: Result<T>,
    ) -> std::result::Result<T, StoreWarning> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(operation, %err, "persistence failed, continuing in memory");
                let warning = StoreWarning {
                    operation,
                    message: err.to_string(),
                };
                self.last_warning = Some(warning.clone());
                Err(warning)
            }
        }
    }
}
