//! Declarative description of every wizard step, its fields, and their rules.
//!
//! A schema is built once at startup and shared immutably. Steps are numbered from 1;
//! the last step is always the review step and owns no input fields.

pub mod rules;

use std::collections::{BTreeMap, HashSet};

use crate::errors::{Result, WizardError};

pub use rules::Rule;

const EMAIL_MESSAGE: &str = "Please enter a valid email address";
const PHONE_MESSAGE: &str = "Please enter a valid phone number";

/// One input field and the rules that must hold for it.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub id: String,
    pub label: String,
    pub rules: Vec<Rule>,
    /// Fixed options offered by the presentation layer. Empty means free text.
    pub choices: Vec<String>,
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            rules: Vec::new(),
            choices: Vec::new(),
        }
    }

    pub fn required(self) -> Self {
        let message = format!("{} is required", self.label);
        self.rule(Rule::required(message))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::email(EMAIL_MESSAGE))
    }

    pub fn phone(self) -> Self {
        self.rule(Rule::phone(PHONE_MESSAGE))
    }

    pub fn range(self, min: f64, max: f64, message: impl Into<String>) -> Self {
        self.rule(Rule::numeric_range(min, max, message))
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }

    /// Fields without rules may be left empty.
    pub fn is_optional(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub number: usize,
    pub title: String,
    pub fields: Vec<String>,
}

impl StepDefinition {
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Immutable step and field layout consumed by the validator and controller.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    steps: Vec<StepDefinition>,
    fields: BTreeMap<String, FieldDefinition>,
}

impl FieldSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The four-step admission application.
    pub fn admission(current_year: i32) -> Self {
        let graduation_years = (-5..5)
            .map(|offset| (current_year + offset).to_string())
            .collect();

        SchemaBuilder::default()
            .step(
                "Personal Details",
                vec![
                    FieldDefinition::new("firstName", "First name").required(),
                    FieldDefinition::new("lastName", "Last name").required(),
                    FieldDefinition::new("email", "Email").required().email(),
                    FieldDefinition::new("phone", "Phone number").required().phone(),
                    FieldDefinition::new("dateOfBirth", "Date of birth").required(),
                    FieldDefinition::new("gender", "Gender").required(),
                    FieldDefinition::new("address", "Address").required(),
                    FieldDefinition::new("city", "City").required(),
                    FieldDefinition::new("state", "State").required(),
                    FieldDefinition::new("zipCode", "ZIP code").required(),
                ],
            )
            .step(
                "Academic History",
                vec![
                    FieldDefinition::new("highSchoolName", "High school name").required(),
                    FieldDefinition::new("graduationYear", "Graduation year")
                        .required()
                        .with_choices(graduation_years),
                    FieldDefinition::new("gpa", "GPA").required().range(
                        0.0,
                        4.0,
                        "GPA must be between 0.0 and 4.0",
                    ),
                    FieldDefinition::new("satScore", "SAT score"),
                    FieldDefinition::new("actScore", "ACT score"),
                    FieldDefinition::new("previousCollege", "Previous college"),
                    FieldDefinition::new("intendedMajor", "Intended major").required(),
                ],
            )
            .step(
                "Guardian Information",
                vec![
                    FieldDefinition::new("guardianFirstName", "Guardian first name").required(),
                    FieldDefinition::new("guardianLastName", "Guardian last name").required(),
                    FieldDefinition::new("relationship", "Relationship").required(),
                    FieldDefinition::new("guardianPhone", "Guardian phone")
                        .required()
                        .phone(),
                    FieldDefinition::new("guardianEmail", "Guardian email")
                        .required()
                        .email(),
                    FieldDefinition::new("guardianAddress", "Guardian address"),
                    FieldDefinition::new("emergencyContact", "Emergency contact").required(),
                    FieldDefinition::new("emergencyPhone", "Emergency phone")
                        .required()
                        .phone(),
                ],
            )
            .review_step("Review & Submit")
            .build()
            .expect("admission schema is well formed")
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of the trailing review step.
    pub fn review_step(&self) -> usize {
        self.steps.len()
    }

    pub fn contains_step(&self, step: usize) -> bool {
        (1..=self.steps.len()).contains(&step)
    }

    pub fn step(&self, step: usize) -> Option<&StepDefinition> {
        step.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.get(id)
    }

    /// Fields of `step` in declaration order; empty for the review step or unknown steps.
    pub fn fields_in_step(&self, step: usize) -> impl Iterator<Item = &FieldDefinition> {
        self.step(step)
            .into_iter()
            .flat_map(|definition| definition.fields.iter())
            .filter_map(move |id| self.fields.get(id))
    }

    /// Ordered rules for `id`; unknown identifiers have none.
    pub fn rules_for(&self, id: &str) -> &[Rule] {
        self.fields
            .get(id)
            .map(|field| field.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Every field identifier in step order.
    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|step| step.fields.iter().map(String::as_str))
    }

    /// Step that owns `id`, if any.
    pub fn step_of(&self, id: &str) -> Option<usize> {
        self.steps
            .iter()
            .find(|step| step.fields.iter().any(|field| field == id))
            .map(|step| step.number)
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    steps: Vec<(String, Vec<FieldDefinition>)>,
}

impl SchemaBuilder {
    pub fn step(mut self, title: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        self.steps.push((title.into(), fields));
        self
    }

    pub fn review_step(self, title: impl Into<String>) -> Self {
        self.step(title, Vec::new())
    }

    pub fn build(self) -> Result<FieldSchema> {
        if self.steps.is_empty() {
            return Err(WizardError::Schema("schema needs at least one step".into()));
        }
        if let Some((title, _)) = self.steps.last().filter(|(_, fields)| !fields.is_empty()) {
            return Err(WizardError::Schema(format!(
                "review step `{}` must not declare fields",
                title
            )));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());
        let mut fields = BTreeMap::new();
        for (index, (title, definitions)) in self.steps.into_iter().enumerate() {
            let mut ids = Vec::with_capacity(definitions.len());
            for definition in definitions {
                if !seen.insert(definition.id.clone()) {
                    return Err(WizardError::Schema(format!(
                        "field `{}` declared more than once",
                        definition.id
                    )));
                }
                ids.push(definition.id.clone());
                fields.insert(definition.id.clone(), definition);
            }
            steps.push(StepDefinition {
                number: index + 1,
                title,
                fields: ids,
            });
        }

        Ok(FieldSchema { steps, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_schema_layout() {
        let schema = FieldSchema::admission(2025);
        assert_eq!(schema.step_count(), 4);
        assert_eq!(schema.fields_in_step(1).count(), 10);
        assert_eq!(schema.fields_in_step(2).count(), 7);
        assert_eq!(schema.fields_in_step(3).count(), 8);
        assert_eq!(schema.fields_in_step(4).count(), 0);
        assert_eq!(schema.step(4).map(|s| s.title.as_str()), Some("Review & Submit"));
        assert_eq!(schema.step_of("gpa"), Some(2));
        assert_eq!(schema.step_of("nope"), None);
    }

    #[test]
    fn graduation_years_span_ten_years_around_current() {
        let schema = FieldSchema::admission(2025);
        let choices = &schema.field("graduationYear").expect("field").choices;
        assert_eq!(choices.first().map(String::as_str), Some("2020"));
        assert_eq!(choices.last().map(String::as_str), Some("2029"));
        assert_eq!(choices.len(), 10);
    }

    #[test]
    fn rules_keep_declaration_order() {
        let schema = FieldSchema::admission(2025);
        let rules = schema.rules_for("email");
        assert_eq!(rules.len(), 2);
        assert!(matches!(rules[0], Rule::Required { .. }));
        assert!(matches!(rules[1], Rule::EmailShaped { .. }));
        assert!(schema.rules_for("satScore").is_empty());
        assert!(schema.rules_for("unknown").is_empty());
    }

    #[test]
    fn builder_rejects_duplicate_fields() {
        let result = FieldSchema::builder()
            .step("One", vec![FieldDefinition::new("name", "Name")])
            .step("Two", vec![FieldDefinition::new("name", "Name")])
            .review_step("Review")
            .build();
        assert!(matches!(result, Err(WizardError::Schema(_))));
    }

    #[test]
    fn builder_requires_fieldless_last_step() {
        let result = FieldSchema::builder()
            .step("Only", vec![FieldDefinition::new("name", "Name")])
            .build();
        assert!(matches!(result, Err(WizardError::Schema(_))));
        assert!(FieldSchema::builder().build().is_err());
    }

    #[test]
    fn single_review_step_schema_is_valid() {
        let schema = FieldSchema::builder()
            .review_step("Confirm")
            .build()
            .expect("schema");
        assert_eq!(schema.step_count(), 1);
        assert!(schema.contains_step(1));
        assert!(!schema.contains_step(0));
        assert!(!schema.contains_step(2));
    }
}
