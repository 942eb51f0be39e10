//! CV document – the content model and its mutation API.
//!
//! All user-entered data lives in one [`CvContent`] aggregate owned by a
//! [`CvDocument`]. Every mutation is total: bad input degrades to an
//! [`EditOutcome`] instead of an error, and each call touches exactly one
//! field or one element. Applied mutations bump a [`Revision`] that is
//! published on a `tokio::sync::watch` channel so the preview and the wizard
//! can recompute on change instead of on every call.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::DocumentError;

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Contact details and header content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub position: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub location: String,
    /// `data:<mime>;base64,...` URI of the uploaded photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

/// Opaque, session-unique identifier of a work-experience entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperienceId(u64);

impl ExperienceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exp-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: ExperienceId,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub company: String,
    /// `YYYY-MM`
    #[serde(default)]
    pub start_date: String,
    /// `YYYY-MM`; empty while `is_current_job` is set.
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub is_current_job: bool,
    #[serde(default)]
    pub description: String,
}

impl WorkExperience {
    fn blank(id: ExperienceId) -> Self {
        Self {
            id,
            position: String::new(),
            company: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            is_current_job: false,
            description: String::new(),
        }
    }

    fn field_mut(&mut self, field: ExperienceField) -> &mut String {
        match field {
            ExperienceField::Position => &mut self.position,
            ExperienceField::Company => &mut self.company,
            ExperienceField::StartDate => &mut self.start_date,
            ExperienceField::EndDate => &mut self.end_date,
            ExperienceField::Description => &mut self.description,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub institution: String,
    pub major: String,
    pub graduation_year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpa: Option<String>,
}

/// The whole serialisable CV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvContent {
    pub personal_info: PersonalInfo,
    pub summary: String,
    pub work_experience: Vec<WorkExperience>,
    pub education: Education,
    pub skills: Vec<String>,
}

// ---------------------------------------------------------------------------
// Field selectors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonalField {
    FullName,
    Position,
    Email,
    Phone,
    Linkedin,
    Location,
}

impl PersonalField {
    pub fn label(self) -> &'static str {
        match self {
            PersonalField::FullName => "full name",
            PersonalField::Position => "position",
            PersonalField::Email => "email",
            PersonalField::Phone => "phone",
            PersonalField::Linkedin => "LinkedIn",
            PersonalField::Location => "location",
        }
    }

    pub fn get(self, info: &PersonalInfo) -> &str {
        match self {
            PersonalField::FullName => &info.full_name,
            PersonalField::Position => &info.position,
            PersonalField::Email => &info.email,
            PersonalField::Phone => &info.phone,
            PersonalField::Linkedin => &info.linkedin,
            PersonalField::Location => &info.location,
        }
    }

    fn get_mut(self, info: &mut PersonalInfo) -> &mut String {
        match self {
            PersonalField::FullName => &mut info.full_name,
            PersonalField::Position => &mut info.position,
            PersonalField::Email => &mut info.email,
            PersonalField::Phone => &mut info.phone,
            PersonalField::Linkedin => &mut info.linkedin,
            PersonalField::Location => &mut info.location,
        }
    }
}

/// Text fields of a work-experience entry. `is_current_job` has its own
/// setter because it also clears the end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperienceField {
    Position,
    Company,
    StartDate,
    EndDate,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationField {
    Institution,
    Major,
    GraduationYear,
    /// Empty string clears the GPA.
    Gpa,
}

/// Result of a mutation, for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The document changed.
    Applied,
    /// The value is already present; nothing changed.
    Duplicate,
    /// Empty input, missing target, or a write of the current value.
    Ignored,
}

impl EditOutcome {
    pub fn is_applied(self) -> bool {
        self == EditOutcome::Applied
    }
}

/// What the last applied mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Loaded,
    PersonalInfo(PersonalField),
    ProfileImage,
    Summary,
    ExperienceAdded(ExperienceId),
    ExperienceUpdated(ExperienceId),
    ExperienceRemoved(ExperienceId),
    Education(EducationField),
    SkillAdded,
    SkillRemoved,
}

/// Monotonic document version published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub number: u64,
    pub change: Change,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Owner of the session's CV content.
#[derive(Debug)]
pub struct CvDocument {
    content: CvContent,
    next_id: u64,
    revision: u64,
    changes: watch::Sender<Revision>,
}

impl Default for CvDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CvDocument {
    /// An empty document.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(Revision {
            number: 0,
            change: Change::Loaded,
        });
        Self {
            content: CvContent::default(),
            next_id: 1,
            revision: 0,
            changes,
        }
    }

    /// Build a document from previously saved content.
    ///
    /// Skills are trimmed and de-duplicated (first occurrence wins) and the id
    /// counter is seeded past the largest existing id.
    pub fn from_content(mut content: CvContent) -> Result<Self, DocumentError> {
        let mut seen = HashSet::new();
        for exp in &mut content.work_experience {
            if !seen.insert(exp.id) {
                return Err(DocumentError::DuplicateExperienceId(exp.id));
            }
            if exp.is_current_job {
                exp.end_date.clear();
            }
        }

        let mut skills: Vec<String> = Vec::with_capacity(content.skills.len());
        for raw in content.skills.drain(..) {
            let skill = raw.trim();
            if !skill.is_empty() && !skills.iter().any(|s| s == skill) {
                skills.push(skill.to_string());
            }
        }
        content.skills = skills;

        let next_id = content
            .work_experience
            .iter()
            .map(|e| e.id.0)
            .max()
            .unwrap_or(0)
            + 1;

        let mut doc = Self::new();
        doc.content = content;
        doc.next_id = next_id;
        doc.publish(Change::Loaded);
        Ok(doc)
    }

    /// Parse camelCase JSON content.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let content: CvContent = serde_json::from_str(json)?;
        Self::from_content(content)
    }

    /// Read and parse a JSON document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.content)
    }

    pub fn content(&self) -> &CvContent {
        &self.content
    }

    pub fn personal_info(&self) -> &PersonalInfo {
        &self.content.personal_info
    }

    pub fn work_experience(&self) -> &[WorkExperience] {
        &self.content.work_experience
    }

    pub fn experience(&self, id: ExperienceId) -> Option<&WorkExperience> {
        self.content.work_experience.iter().find(|e| e.id == id)
    }

    pub fn skills(&self) -> &[String] {
        &self.content.skills
    }

    /// Current revision number. Starts at 0 and only grows.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.changes.subscribe()
    }

    fn publish(&mut self, change: Change) {
        self.revision += 1;
        log::debug!("document revision {} ({change:?})", self.revision);
        self.changes.send_replace(Revision {
            number: self.revision,
            change,
        });
    }

    /// Overwrite `slot` with `value`, publishing `change` if it differs.
    fn write(
        &mut self,
        change: Change,
        value: String,
        slot: impl FnOnce(&mut CvContent) -> &mut String,
    ) -> EditOutcome {
        let target = slot(&mut self.content);
        if *target == value {
            return EditOutcome::Ignored;
        }
        *target = value;
        self.publish(change);
        EditOutcome::Applied
    }

    // ── Personal info ──────────────────────────────────────────────────────

    pub fn set_personal_info(
        &mut self,
        field: PersonalField,
        value: impl Into<String>,
    ) -> EditOutcome {
        self.write(Change::PersonalInfo(field), value.into(), |c| {
            field.get_mut(&mut c.personal_info)
        })
    }

    /// Store an already-validated data URI (see [`crate::upload`]).
    pub fn set_profile_image(&mut self, data_uri: impl Into<String>) -> EditOutcome {
        let data_uri = data_uri.into();
        if self.content.personal_info.profile_image.as_deref() == Some(data_uri.as_str()) {
            return EditOutcome::Ignored;
        }
        self.content.personal_info.profile_image = Some(data_uri);
        self.publish(Change::ProfileImage);
        EditOutcome::Applied
    }

    pub fn clear_profile_image(&mut self) -> EditOutcome {
        if self.content.personal_info.profile_image.take().is_none() {
            return EditOutcome::Ignored;
        }
        self.publish(Change::ProfileImage);
        EditOutcome::Applied
    }

    pub fn set_summary(&mut self, text: impl Into<String>) -> EditOutcome {
        self.write(Change::Summary, text.into(), |c| &mut c.summary)
    }

    // ── Work experience ────────────────────────────────────────────────────

    /// Append a blank entry and return its id.
    pub fn add_work_experience(&mut self) -> ExperienceId {
        let id = ExperienceId(self.next_id);
        self.next_id += 1;
        assert!(
            self.experience(id).is_none(),
            "experience id {id} generated twice"
        );
        self.content.work_experience.push(WorkExperience::blank(id));
        self.publish(Change::ExperienceAdded(id));
        id
    }

    pub fn update_work_experience(
        &mut self,
        id: ExperienceId,
        field: ExperienceField,
        value: impl Into<String>,
    ) -> EditOutcome {
        let value = value.into();
        let Some(exp) = self.content.work_experience.iter_mut().find(|e| e.id == id) else {
            log::debug!("update of unknown experience {id} ignored");
            return EditOutcome::Ignored;
        };
        let slot = exp.field_mut(field);
        if *slot == value {
            return EditOutcome::Ignored;
        }
        *slot = value;
        self.publish(Change::ExperienceUpdated(id));
        EditOutcome::Applied
    }

    /// Toggle the "current job" flag. Turning it on also clears the end date
    /// within the same revision.
    pub fn set_current_job(&mut self, id: ExperienceId, current: bool) -> EditOutcome {
        let Some(exp) = self.content.work_experience.iter_mut().find(|e| e.id == id) else {
            return EditOutcome::Ignored;
        };
        if exp.is_current_job == current && (!current || exp.end_date.is_empty()) {
            return EditOutcome::Ignored;
        }
        exp.is_current_job = current;
        if current {
            exp.end_date.clear();
        }
        self.publish(Change::ExperienceUpdated(id));
        EditOutcome::Applied
    }

    pub fn remove_work_experience(&mut self, id: ExperienceId) -> EditOutcome {
        let before = self.content.work_experience.len();
        self.content.work_experience.retain(|e| e.id != id);
        if self.content.work_experience.len() == before {
            return EditOutcome::Ignored;
        }
        self.publish(Change::ExperienceRemoved(id));
        EditOutcome::Applied
    }

    // ── Education ──────────────────────────────────────────────────────────

    pub fn set_education(
        &mut self,
        field: EducationField,
        value: impl Into<String>,
    ) -> EditOutcome {
        let value = value.into();
        let change = Change::Education(field);
        match field {
            EducationField::Institution => {
                self.write(change, value, |c| &mut c.education.institution)
            }
            EducationField::Major => self.write(change, value, |c| &mut c.education.major),
            EducationField::GraduationYear => {
                self.write(change, value, |c| &mut c.education.graduation_year)
            }
            EducationField::Gpa => {
                let gpa = (!value.trim().is_empty()).then_some(value);
                if self.content.education.gpa == gpa {
                    return EditOutcome::Ignored;
                }
                self.content.education.gpa = gpa;
                self.publish(change);
                EditOutcome::Applied
            }
        }
    }

    // ── Skills ─────────────────────────────────────────────────────────────

    /// Trim and append a skill. Empty input is ignored; an exact match of an
    /// existing skill reports [`EditOutcome::Duplicate`].
    pub fn add_skill(&mut self, raw: &str) -> EditOutcome {
        let skill = raw.trim();
        if skill.is_empty() {
            return EditOutcome::Ignored;
        }
        if self.content.skills.iter().any(|s| s == skill) {
            log::warn!("skill {skill:?} already listed");
            return EditOutcome::Duplicate;
        }
        self.content.skills.push(skill.to_string());
        self.publish(Change::SkillAdded);
        EditOutcome::Applied
    }

    pub fn remove_skill(&mut self, value: &str) -> EditOutcome {
        let before = self.content.skills.len();
        self.content.skills.retain(|s| s != value);
        if self.content.skills.len() == before {
            return EditOutcome::Ignored;
        }
        self.publish(Change::SkillRemoved);
        EditOutcome::Applied
    }
}
