//! Session – owns one CV document and everything that reacts to it.
//!
//! A [`Session`] is created when editing starts and dropped when it ends.
//! The wizard and the preview subscribe to the document's change channel;
//! user-facing feedback goes through a [`Notifier`].

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assist::{generate_description, generate_summary, TemplateAssistant, TextAssistant};
use crate::document::{
    CvDocument, EditOutcome, EducationField, ExperienceField, ExperienceId, PersonalField,
};
use crate::error::{AssistError, ConfigError, ExportError, UploadError};
use crate::pipeline::{ExportConfig, ExportJob, ExportPipeline, ExportedFile};
use crate::preview::{Preview, RenderTree};
use crate::raster::Rasterizer;
use crate::template::{TemplateChoice, TemplateSelector};
use crate::upload::read_profile_image;
use crate::wizard::{GatePolicy, Transition, WizardController};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// User-facing feedback raised by the session and the export pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DuplicateSkill(String),
    StepBlocked { step: u8, missing: Vec<&'static str> },
    IncompleteInformation(Vec<&'static str>),
    ProfileImageUpdated,
    ProfileImageRejected(String),
    ExportStarted { file_name: String },
    ExportFinished { file_name: String, pages: usize, bytes: usize },
    /// The export never started.
    ExportRejected(String),
    ExportFailed,
}

/// Sink for [`Notice`]s (a toast area, a status bar, a test recorder).
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::ExportStarted { .. }
            | Notice::ExportFinished { .. }
            | Notice::ProfileImageUpdated => log::info!(target: "cv_forge::notice", "{notice:?}"),
            _ => log::warn!(target: "cv_forge::notice", "{notice:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub gate_policy: GatePolicy,
    pub template: TemplateChoice,
    /// Preview width in CSS pixels (default: A4 at 96 dpi).
    pub viewport_width_px: f32,
    pub export: ExportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gate_policy: GatePolicy::default(),
            template: TemplateChoice::default(),
            viewport_width_px: 794.0,
            export: ExportConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.viewport_width_px.is_finite() && self.viewport_width_px > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport width must be positive, got {}",
                self.viewport_width_px
            )));
        }
        self.export.validate()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session<R: Rasterizer> {
    document: CvDocument,
    wizard: WizardController,
    templates: TemplateSelector,
    preview: Preview,
    pipeline: ExportPipeline<R>,
    assistant: Box<dyn TextAssistant>,
    notifier: Arc<dyn Notifier>,
}

impl<R: Rasterizer> Session<R> {
    /// Start a session over an empty document.
    pub fn new(config: SessionConfig, rasterizer: R) -> Self {
        Self::with_document(CvDocument::new(), config, rasterizer, Arc::new(LogNotifier))
    }

    pub fn with_document(
        document: CvDocument,
        config: SessionConfig,
        rasterizer: R,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let wizard = WizardController::new(&document, config.gate_policy);
        let preview = Preview::new(&document, config.viewport_width_px);
        let pipeline =
            ExportPipeline::with_notifier(rasterizer, config.export, Arc::clone(&notifier));
        Self {
            document,
            wizard,
            templates: TemplateSelector::new(config.template),
            preview,
            pipeline,
            assistant: Box::new(TemplateAssistant),
            notifier,
        }
    }

    pub fn with_assistant(mut self, assistant: impl TextAssistant + 'static) -> Self {
        self.assistant = Box::new(assistant);
        self
    }

    pub fn document(&self) -> &CvDocument {
        &self.document
    }

    pub fn template(&self) -> TemplateChoice {
        self.templates.current()
    }

    pub fn pipeline(&self) -> &ExportPipeline<R> {
        &self.pipeline
    }

    /// The wizard, refreshed against the latest document revision.
    pub fn wizard(&mut self) -> &WizardController {
        self.wizard.refresh(&self.document);
        &self.wizard
    }

    /// The current preview tree.
    pub fn render_tree(&mut self) -> &RenderTree {
        self.preview.tree(&self.document, self.templates.current())
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn attach_preview(&mut self, width_px: f32) {
        self.preview.attach(width_px);
    }

    pub fn detach_preview(&mut self) {
        self.preview.detach();
    }

    // ── Edits ──────────────────────────────────────────────────────────────

    pub fn set_personal_info(
        &mut self,
        field: PersonalField,
        value: impl Into<String>,
    ) -> EditOutcome {
        self.document.set_personal_info(field, value)
    }

    pub fn set_summary(&mut self, text: impl Into<String>) -> EditOutcome {
        self.document.set_summary(text)
    }

    pub fn add_work_experience(&mut self) -> ExperienceId {
        self.document.add_work_experience()
    }

    pub fn update_work_experience(
        &mut self,
        id: ExperienceId,
        field: ExperienceField,
        value: impl Into<String>,
    ) -> EditOutcome {
        self.document.update_work_experience(id, field, value)
    }

    pub fn set_current_job(&mut self, id: ExperienceId, current: bool) -> EditOutcome {
        self.document.set_current_job(id, current)
    }

    pub fn remove_work_experience(&mut self, id: ExperienceId) -> EditOutcome {
        self.document.remove_work_experience(id)
    }

    pub fn set_education(
        &mut self,
        field: EducationField,
        value: impl Into<String>,
    ) -> EditOutcome {
        self.document.set_education(field, value)
    }

    pub fn add_skill(&mut self, raw: &str) -> EditOutcome {
        let outcome = self.document.add_skill(raw);
        if outcome == EditOutcome::Duplicate {
            self.notifier
                .notify(Notice::DuplicateSkill(raw.trim().to_string()));
        }
        outcome
    }

    pub fn remove_skill(&mut self, value: &str) -> EditOutcome {
        self.document.remove_skill(value)
    }

    pub fn select_template(&mut self, choice: TemplateChoice) -> bool {
        self.templates.select(choice)
    }

    // ── Wizard ─────────────────────────────────────────────────────────────

    fn report(&self, transition: Transition) -> Transition {
        if let Transition::Blocked { at, missing } = &transition {
            self.notifier.notify(Notice::StepBlocked {
                step: at.number(),
                missing: missing.iter().map(|f| f.label()).collect(),
            });
        }
        transition
    }

    pub fn next_step(&mut self) -> Transition {
        let t = self.wizard.next(&self.document);
        self.report(t)
    }

    pub fn prev_step(&mut self) -> Transition {
        self.wizard.prev()
    }

    pub fn jump_to_step(&mut self, n: i64) -> Transition {
        let t = self.wizard.jump_to(n, &self.document);
        self.report(t)
    }

    // ── Profile image ──────────────────────────────────────────────────────

    /// Read, check and store a profile image. A rejected file leaves the
    /// document untouched.
    pub async fn upload_profile_image(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<EditOutcome, UploadError> {
        match read_profile_image(path).await {
            Ok(uri) => {
                let outcome = self.document.set_profile_image(uri);
                self.notifier.notify(Notice::ProfileImageUpdated);
                Ok(outcome)
            }
            Err(e) => {
                self.notifier.notify(Notice::ProfileImageRejected(e.to_string()));
                Err(e)
            }
        }
    }

    // ── Writing assistance ─────────────────────────────────────────────────

    fn assist_failed(&self, e: AssistError) -> AssistError {
        if let AssistError::IncompleteInformation { missing } = &e {
            self.notifier
                .notify(Notice::IncompleteInformation(missing.clone()));
        }
        e
    }

    /// Fill the summary from name and position.
    pub fn generate_summary(&mut self) -> Result<EditOutcome, AssistError> {
        match generate_summary(self.assistant.as_ref(), self.document.personal_info()) {
            Ok(text) => Ok(self.document.set_summary(text)),
            Err(e) => Err(self.assist_failed(e)),
        }
    }

    /// Fill an entry's description from its company.
    pub fn generate_description(&mut self, id: ExperienceId) -> Result<EditOutcome, AssistError> {
        let Some(exp) = self.document.experience(id) else {
            return Err(AssistError::UnknownExperience(id));
        };
        match generate_description(self.assistant.as_ref(), exp) {
            Ok(text) => Ok(self
                .document
                .update_work_experience(id, ExperienceField::Description, text)),
            Err(e) => Err(self.assist_failed(e)),
        }
    }

    // ── Export ─────────────────────────────────────────────────────────────

    /// Snapshot the preview and claim the export slot without running it.
    pub fn begin_export(&mut self) -> Result<ExportJob<R>, ExportError> {
        let template = self.templates.current();
        let surface = self.preview.surface(&self.document, template);
        self.pipeline
            .begin(surface, &self.document.personal_info().full_name)
    }

    pub async fn export(&mut self) -> Result<ExportedFile, ExportError> {
        self.begin_export()?.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::LayoutRasterizer;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notice>>);

    impl Notifier for Recorder {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    fn session(recorder: &Arc<Recorder>) -> Session<LayoutRasterizer> {
        Session::with_document(
            CvDocument::new(),
            SessionConfig::default(),
            LayoutRasterizer::default(),
            Arc::clone(recorder) as Arc<dyn Notifier>,
        )
    }

    #[test]
    fn config_defaults_and_json() {
        let cfg = SessionConfig::from_json(r#"{"template": "classic", "gate_policy": "advisory"}"#)
            .unwrap();
        assert_eq!(cfg.template, TemplateChoice::Classic);
        assert_eq!(cfg.gate_policy, GatePolicy::Advisory);
        assert_eq!(cfg.viewport_width_px, 794.0);
        assert!(SessionConfig::from_json(r#"{"viewport_width_px": 0}"#).is_err());
    }

    #[test]
    fn duplicate_skill_is_notified() {
        let recorder = Arc::new(Recorder::default());
        let mut s = session(&recorder);
        s.add_skill("Go");
        assert_eq!(s.add_skill(" Go "), EditOutcome::Duplicate);
        assert_eq!(
            recorder.0.lock().unwrap().as_slice(),
            [Notice::DuplicateSkill("Go".into())]
        );
    }

    #[test]
    fn blocked_step_is_notified() {
        let recorder = Arc::new(Recorder::default());
        let mut s = session(&recorder);
        s.set_personal_info(PersonalField::FullName, "Jane");
        assert!(matches!(s.next_step(), Transition::Blocked { .. }));
        assert_eq!(
            recorder.0.lock().unwrap().as_slice(),
            [Notice::StepBlocked {
                step: 1,
                missing: vec!["position", "email"],
            }]
        );
    }

    #[test]
    fn generated_summary_lands_in_document() {
        let recorder = Arc::new(Recorder::default());
        let mut s = session(&recorder);
        assert!(s.generate_summary().is_err());
        s.set_personal_info(PersonalField::FullName, "Jane Doe");
        s.set_personal_info(PersonalField::Position, "Engineer");
        assert_eq!(s.generate_summary().unwrap(), EditOutcome::Applied);
        assert!(s.document().content().summary.starts_with("Jane Doe"));
        assert_eq!(
            recorder.0.lock().unwrap().first(),
            Some(&Notice::IncompleteInformation(vec!["full name", "position"]))
        );
    }

    #[test]
    fn description_needs_company() {
        let recorder = Arc::new(Recorder::default());
        let mut s = session(&recorder);
        let id = s.add_work_experience();
        assert!(s.generate_description(id).is_err());
        s.update_work_experience(id, ExperienceField::Company, "Acme");
        assert_eq!(s.generate_description(id).unwrap(), EditOutcome::Applied);
        s.remove_work_experience(id);
        assert_eq!(
            s.generate_description(id),
            Err(AssistError::UnknownExperience(id))
        );
    }

    #[test]
    fn detached_preview_cannot_export() {
        let recorder = Arc::new(Recorder::default());
        let mut s = session(&recorder);
        s.detach_preview();
        assert!(matches!(s.begin_export(), Err(ExportError::SurfaceUnavailable)));
        assert!(!s.pipeline().is_busy());
    }
}
