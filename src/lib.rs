#![doc(test(attr(deny(warnings))))]

//! Admission Wizard drives a multi-step application form: per-step validation,
//! draft persistence across restarts, periodic autosave and a final submission
//! record with a reference code.

pub mod autosave;
pub mod cli;
pub mod config;
pub mod draft;
pub mod errors;
pub mod review;
pub mod schema;
pub mod store;
pub mod submission;
pub mod time;
pub mod utils;
pub mod validation;
pub mod wizard;

pub use draft::Draft;
pub use errors::{Result, WizardError};
pub use schema::FieldSchema;
pub use store::DraftStore;
pub use submission::SubmissionRecord;
pub use validation::ValidationResult;
pub use wizard::{SharedSession, StepStatus, SubmitOutcome, WizardSession};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Admission wizard tracing initialized.");
    });
}
