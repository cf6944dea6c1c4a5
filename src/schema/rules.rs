use std::{fmt, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::draft::Draft;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

// Optional country code (1-4 digits, optional `+`), optional area code (1-3 digits,
// optional parentheses), then a 3-4 digit group and a 4 digit tail.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+?\d{1,4}[-.\s]?)?(?:\(?\d{1,3}\)?[-.\s]?)?\d{3,4}[-.\s]?\d{4}$")
        .expect("phone pattern compiles")
});

type RuleCallback = dyn Fn(&str, &Draft) -> Result<(), String> + Send + Sync;
pub type SharedRuleCallback = Arc<RuleCallback>;

/// A single predicate a field value must satisfy, with the message shown when it does not.
#[derive(Clone)]
pub enum Rule {
    Required { message: String },
    EmailShaped { message: String },
    PhoneShaped { message: String },
    NumericRange { min: f64, max: f64, message: String },
    /// Arbitrary check with access to the whole draft for cross-field rules.
    Custom(SharedRuleCallback),
}

impl Rule {
    pub fn required(message: impl Into<String>) -> Self {
        Rule::Required {
            message: message.into(),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        Rule::EmailShaped {
            message: message.into(),
        }
    }

    pub fn phone(message: impl Into<String>) -> Self {
        Rule::PhoneShaped {
            message: message.into(),
        }
    }

    pub fn numeric_range(min: f64, max: f64, message: impl Into<String>) -> Self {
        Rule::NumericRange {
            min,
            max,
            message: message.into(),
        }
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&str, &Draft) -> Result<(), String> + Send + Sync + 'static,
    {
        Rule::Custom(Arc::new(check))
    }

    /// Evaluates the rule against `value`, returning the failure message when it does not hold.
    pub fn check(&self, value: &str, draft: &Draft) -> Result<(), String> {
        match self {
            Rule::Required { message } => fail_unless(is_present(value), message),
            Rule::EmailShaped { message } => fail_unless(is_email_shaped(value), message),
            Rule::PhoneShaped { message } => fail_unless(is_phone_shaped(value), message),
            Rule::NumericRange { min, max, message } => {
                fail_unless(in_numeric_range(value, *min, *max), message)
            }
            Rule::Custom(check) => check(value, draft),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required { .. } => f.write_str("Required"),
            Rule::EmailShaped { .. } => f.write_str("EmailShaped"),
            Rule::PhoneShaped { .. } => f.write_str("PhoneShaped"),
            Rule::NumericRange { min, max, .. } => write!(f, "NumericRange({min}, {max})"),
            Rule::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn fail_unless(holds: bool, message: &str) -> Result<(), String> {
    if holds {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

pub fn is_phone_shaped(value: &str) -> bool {
    PHONE_PATTERN.is_match(value)
}

/// The only place numeric coercion of string field values happens.
pub fn in_numeric_range(value: &str, min: f64, max: f64) -> bool {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => number >= min && number <= max,
        _ => false,
    }
}
