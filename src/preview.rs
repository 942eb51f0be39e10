//! Preview projection – a pure, read-only view of the document.
//!
//! [`project`] maps content + template to a [`RenderTree`] with every
//! visibility rule already applied: hidden sections are absent, not empty.
//! [`Preview`] subscribes to the document and re-projects only after a new
//! revision or a template switch; it also owns the viewport the export
//! pipeline captures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::document::{CvContent, CvDocument, Revision, WorkExperience};
use crate::template::TemplateChoice;

pub const NAME_PLACEHOLDER: &str = "Full Name";
pub const POSITION_PLACEHOLDER: &str = "Target Position";
pub const PRESENT: &str = "Present";

/// Fully projected preview content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    pub template: TemplateChoice,
    pub header: Header,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub position: String,
    pub avatar: Avatar,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Avatar {
    /// Data URI of the uploaded photo.
    Image(String),
    /// Generic person glyph.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Email,
    Phone,
    Linkedin,
    Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub kind: ContactKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Section {
    Summary {
        text: String,
    },
    Experience {
        entries: Vec<ExperienceEntry>,
    },
    Education {
        institution: String,
        major: String,
        /// Graduation year plus the GPA suffix when a GPA is set.
        detail: String,
    },
    Skills {
        items: Vec<String>,
    },
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Summary { .. } => "About Me",
            Section::Experience { .. } => "Work Experience",
            Section::Education { .. } => "Education",
            Section::Skills { .. } => "Skills",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub position: String,
    pub company: String,
    pub date_range: String,
    pub description: String,
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// `"2020-01"` → `"January 2020"`. Anything unparseable is returned verbatim.
pub fn format_month(value: &str) -> String {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

/// `"{start} – {end}"`, with the end forced to "Present" for a current job
/// or an empty end date. An empty start leaves only the end.
pub fn date_range(exp: &WorkExperience) -> String {
    let end = if exp.is_current_job || exp.end_date.trim().is_empty() {
        PRESENT.to_string()
    } else {
        format_month(&exp.end_date)
    };
    if exp.start_date.trim().is_empty() {
        end
    } else {
        format!("{} \u{2013} {}", format_month(&exp.start_date), end)
    }
}

/// Project content into the preview tree. Pure and idempotent.
pub fn project(content: &CvContent, template: TemplateChoice) -> RenderTree {
    let info = &content.personal_info;

    let contacts = [
        (ContactKind::Email, &info.email),
        (ContactKind::Phone, &info.phone),
        (ContactKind::Linkedin, &info.linkedin),
        (ContactKind::Location, &info.location),
    ]
    .into_iter()
    .filter(|(_, v)| !v.trim().is_empty())
    .map(|(kind, v)| Contact {
        kind,
        text: v.clone(),
    })
    .collect();

    let header = Header {
        name: or_placeholder(&info.full_name, NAME_PLACEHOLDER),
        position: or_placeholder(&info.position, POSITION_PLACEHOLDER),
        avatar: match &info.profile_image {
            Some(uri) if !uri.is_empty() => Avatar::Image(uri.clone()),
            _ => Avatar::Placeholder,
        },
        contacts,
    };

    let mut sections = Vec::new();

    if !content.summary.trim().is_empty() {
        sections.push(Section::Summary {
            text: content.summary.clone(),
        });
    }

    if !content.work_experience.is_empty() {
        sections.push(Section::Experience {
            entries: content
                .work_experience
                .iter()
                .map(|exp| ExperienceEntry {
                    position: exp.position.clone(),
                    company: exp.company.clone(),
                    date_range: date_range(exp),
                    description: exp.description.clone(),
                })
                .collect(),
        });
    }

    let edu = &content.education;
    if !edu.institution.trim().is_empty() || !edu.major.trim().is_empty() {
        let mut detail = edu.graduation_year.trim().to_string();
        if let Some(gpa) = edu.gpa.as_deref().filter(|g| !g.trim().is_empty()) {
            if !detail.is_empty() {
                detail.push_str(" | ");
            }
            detail.push_str("GPA: ");
            detail.push_str(gpa.trim());
        }
        sections.push(Section::Education {
            institution: edu.institution.clone(),
            major: edu.major.clone(),
            detail,
        });
    }

    if !content.skills.is_empty() {
        sections.push(Section::Skills {
            items: content.skills.clone(),
        });
    }

    RenderTree {
        template,
        header,
        sections,
    }
}

// ---------------------------------------------------------------------------
// Subscribed preview
// ---------------------------------------------------------------------------

/// Owned capture of the preview: what the export pipeline rasterises.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub tree: RenderTree,
    /// Viewport width in CSS pixels.
    pub width_px: f32,
}

/// Cached projection kept in sync with a document.
pub struct Preview {
    changes: watch::Receiver<Revision>,
    viewport_px: Option<f32>,
    cached: Option<RenderTree>,
    projections: u64,
}

impl Preview {
    /// Subscribe to `doc` with an attached viewport of `width_px`.
    pub fn new(doc: &CvDocument, width_px: f32) -> Self {
        Self {
            changes: doc.subscribe(),
            viewport_px: Some(width_px),
            cached: None,
            projections: 0,
        }
    }

    pub fn attach(&mut self, width_px: f32) {
        self.viewport_px = Some(width_px);
    }

    /// Detach the viewport; [`Preview::surface`] returns `None` until
    /// re-attached.
    pub fn detach(&mut self) {
        self.viewport_px = None;
    }

    pub fn is_attached(&self) -> bool {
        self.viewport_px.is_some()
    }

    /// How many times the tree was actually recomputed.
    pub fn projection_count(&self) -> u64 {
        self.projections
    }

    /// The current tree, re-projected only if the document or template changed.
    pub fn tree(&mut self, doc: &CvDocument, template: TemplateChoice) -> &RenderTree {
        let changed = self.changes.has_changed().unwrap_or(false);
        let stale = changed
            || self
                .cached
                .as_ref()
                .map_or(true, |tree| tree.template != template);
        if stale {
            self.changes.borrow_and_update();
            self.projections += 1;
            log::debug!("re-projecting preview (revision {})", doc.revision());
            self.cached = Some(project(doc.content(), template));
        }
        self.cached
            .get_or_insert_with(|| project(doc.content(), template))
    }

    /// Snapshot for export, or `None` when no viewport is attached.
    pub fn surface(&mut self, doc: &CvDocument, template: TemplateChoice) -> Option<Surface> {
        let width_px = self.viewport_px?;
        let tree = self.tree(doc, template).clone();
        Some(Surface { tree, width_px })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EducationField, ExperienceField, PersonalField};

    #[test]
    fn empty_document_shows_header_only() {
        let tree = project(&CvContent::default(), TemplateChoice::Modern);
        assert_eq!(tree.header.name, NAME_PLACEHOLDER);
        assert_eq!(tree.header.position, POSITION_PLACEHOLDER);
        assert_eq!(tree.header.avatar, Avatar::Placeholder);
        assert!(tree.header.contacts.is_empty());
        assert!(tree.sections.is_empty());
    }

    #[test]
    fn current_job_reads_present() {
        let mut doc = CvDocument::new();
        let id = doc.add_work_experience();
        doc.update_work_experience(id, ExperienceField::StartDate, "2020-01");
        doc.update_work_experience(id, ExperienceField::EndDate, "2021-03");
        doc.set_current_job(id, true);
        let tree = project(doc.content(), TemplateChoice::Modern);
        match &tree.sections[0] {
            Section::Experience { entries } => {
                assert_eq!(entries[0].date_range, "January 2020 \u{2013} Present")
            }
            other => panic!("expected experience, got {other:?}"),
        }
    }

    #[test]
    fn ended_job_formats_both_months() {
        let mut doc = CvDocument::new();
        let id = doc.add_work_experience();
        doc.update_work_experience(id, ExperienceField::StartDate, "2018-11");
        doc.update_work_experience(id, ExperienceField::EndDate, "2020-02");
        let exp = doc.experience(id).unwrap();
        assert_eq!(date_range(exp), "November 2018 \u{2013} February 2020");
    }

    #[test]
    fn unparseable_month_is_verbatim() {
        assert_eq!(format_month("Spring 2019"), "Spring 2019");
    }

    #[test]
    fn education_guard_and_gpa_suffix() {
        let mut doc = CvDocument::new();
        doc.set_education(EducationField::GraduationYear, "2019");
        assert!(project(doc.content(), TemplateChoice::Modern).sections.is_empty());

        doc.set_education(EducationField::Major, "Computer Science");
        doc.set_education(EducationField::Gpa, "3.8");
        let tree = project(doc.content(), TemplateChoice::Modern);
        assert_eq!(
            tree.sections,
            vec![Section::Education {
                institution: String::new(),
                major: "Computer Science".to_string(),
                detail: "2019 | GPA: 3.8".to_string(),
            }]
        );
    }

    #[test]
    fn sections_keep_fixed_order() {
        let mut doc = CvDocument::new();
        doc.add_skill("Rust");
        doc.set_summary("Builder of things");
        doc.add_work_experience();
        doc.set_education(EducationField::Institution, "MIT");
        let titles: Vec<_> = project(doc.content(), TemplateChoice::Classic)
            .sections
            .iter()
            .map(Section::title)
            .collect();
        assert_eq!(titles, ["About Me", "Work Experience", "Education", "Skills"]);
    }

    #[test]
    fn preview_recomputes_only_on_change() {
        let mut doc = CvDocument::new();
        let mut preview = Preview::new(&doc, 794.0);
        let first = preview.tree(&doc, TemplateChoice::Modern).clone();
        let again = preview.tree(&doc, TemplateChoice::Modern).clone();
        assert_eq!(first, again);
        assert_eq!(preview.projection_count(), 1);

        doc.set_personal_info(PersonalField::FullName, "Jane Doe");
        assert_eq!(preview.tree(&doc, TemplateChoice::Modern).header.name, "Jane Doe");
        assert_eq!(preview.projection_count(), 2);

        preview.tree(&doc, TemplateChoice::Creative);
        assert_eq!(preview.projection_count(), 3);
    }

    #[test]
    fn detached_preview_has_no_surface() {
        let doc = CvDocument::new();
        let mut preview = Preview::new(&doc, 794.0);
        assert!(preview.surface(&doc, TemplateChoice::Modern).is_some());
        preview.detach();
        assert!(preview.surface(&doc, TemplateChoice::Modern).is_none());
    }
}
