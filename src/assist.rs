//! Writing assistance – deterministic text generators for the summary and
//! work-experience descriptions.
//!
//! Generators are only invoked once their inputs are known to be non-empty;
//! otherwise an [`AssistError::IncompleteInformation`] is returned and the
//! generator is never called.

use crate::document::{PersonalField, PersonalInfo, WorkExperience};
use crate::error::AssistError;

/// A `(context) -> text` generator.
pub trait TextAssistant: Send + Sync {
    fn summary(&self, full_name: &str, position: &str) -> String;
    fn description(&self, company: &str) -> String;
}

/// The built-in fill-in-the-blanks generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateAssistant;

impl TextAssistant for TemplateAssistant {
    fn summary(&self, full_name: &str, position: &str) -> String {
        summary_stub(full_name, position)
    }

    fn description(&self, company: &str) -> String {
        description_stub(company)
    }
}

pub fn summary_stub(full_name: &str, position: &str) -> String {
    format!(
        "{full_name} is a dedicated {position} with a track record of delivering \
         high-quality results. Known for clear communication, ownership of \
         outcomes and a steady drive to learn, {full_name} brings both \
         technical depth and a collaborative mindset to every team."
    )
}

pub fn description_stub(company: &str) -> String {
    format!(
        "Contributed to key initiatives at {company}, collaborating with \
         cross-functional teams to ship reliable work on schedule. Took \
         ownership of day-to-day delivery and helped improve team processes."
    )
}

/// Generate a summary from the personal info, if name and position are set.
pub fn generate_summary(
    assistant: &dyn TextAssistant,
    info: &PersonalInfo,
) -> Result<String, AssistError> {
    let missing: Vec<&'static str> = [PersonalField::FullName, PersonalField::Position]
        .into_iter()
        .filter(|f| f.get(info).trim().is_empty())
        .map(PersonalField::label)
        .collect();
    if !missing.is_empty() {
        log::warn!("summary generation needs {}", missing.join(", "));
        return Err(AssistError::IncompleteInformation { missing });
    }
    Ok(assistant.summary(info.full_name.trim(), info.position.trim()))
}

/// Generate a description for `exp`, if its company is set.
pub fn generate_description(
    assistant: &dyn TextAssistant,
    exp: &WorkExperience,
) -> Result<String, AssistError> {
    let company = exp.company.trim();
    if company.is_empty() {
        log::warn!("description generation for {} needs a company", exp.id);
        return Err(AssistError::IncompleteInformation {
            missing: vec!["company"],
        });
    }
    Ok(assistant.description(company))
}
