use crate::{draft::Draft, schema::FieldSchema};

/// One titled block of the review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSection {
    pub step: usize,
    pub title: String,
    pub lines: Vec<ReviewLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLine {
    pub label: String,
    pub value: String,
}

/// Summarizes every input step for confirmation. Optional fields left blank are skipped.
pub fn review_sections(schema: &FieldSchema, draft: &Draft) -> Vec<ReviewSection> {
    schema
        .steps()
        .iter()
        .filter(|step| step.has_fields())
        .map(|step| ReviewSection {
            step: step.number,
            title: step.title.clone(),
            lines: schema
                .fields_in_step(step.number)
                .filter(|field| !(field.is_optional() && draft.get(&field.id).trim().is_empty()))
                .map(|field| ReviewLine {
                    label: field.label.clone(),
                    value: draft.get(&field.id).to_string(),
                })
                .collect(),
        })
        .collect()
}
