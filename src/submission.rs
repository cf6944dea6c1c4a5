use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{draft::Draft, time::Clock};

pub const DEFAULT_REFERENCE_PREFIX: &str = "APP";
const REFERENCE_DIGITS: usize = 8;

/// Frozen copy of a draft at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
    application_ref: String,
    submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn reference(&self) -> &str {
        &self.application_ref
    }

    /// ISO-8601 UTC timestamp with millisecond precision.
    pub fn submitted_at_iso(&self) -> String {
        self.submitted_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn value(&self, id: &str) -> &str {
        self.fields.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// Produces submission records stamped by an injected clock.
pub struct SubmissionBuilder<'a> {
    clock: &'a dyn Clock,
    prefix: &'a str,
}

impl<'a> SubmissionBuilder<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
            prefix: DEFAULT_REFERENCE_PREFIX,
        }
    }

    pub fn with_prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn build(&self, draft: &Draft) -> SubmissionRecord {
        let submitted_at = self.clock.now();
        SubmissionRecord {
            fields: draft.clone().into_values(),
            application_ref: reference_code(self.prefix, submitted_at.timestamp_millis()),
            submitted_at,
        }
    }
}

/// `prefix` followed by the last eight digits of `millis`, zero-padded.
pub fn reference_code(prefix: &str, millis: i64) -> String {
    let digits = millis.unsigned_abs().to_string();
    let tail = &digits[digits.len().saturating_sub(REFERENCE_DIGITS)..];
    format!("{prefix}{tail:0>width$}", width = REFERENCE_DIGITS)
}
