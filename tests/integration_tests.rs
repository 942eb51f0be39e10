//! Integration tests for the cv-forge session and export pipeline.
//!
//! These tests validate:
//! - The documented Jane Doe scenario end to end
//! - Edits, wizard gating and preview recomputation through a session
//! - Single-flight export and snapshot capture
//! - Multi-page slicing with no gaps or overlaps
//! - Upload limits and failure recovery

use std::future::Future;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use cv_forge::document::{CvDocument, EditOutcome, ExperienceField, PersonalField};
use cv_forge::error::{ExportError, RenderError, UploadError};
use cv_forge::fonts::FontManager;
use cv_forge::layout_config::DocumentPlan;
use cv_forge::pipeline::{ExportConfig, ExportPipeline};
use cv_forge::preview::{project, Avatar, Section, Surface};
use cv_forge::raster::{paint_surface, LayoutRasterizer, RasterImage, Rasterizer};
use cv_forge::samples;
use cv_forge::session::{Notice, Notifier, Session, SessionConfig};
use cv_forge::template::TemplateChoice;
use cv_forge::upload::MAX_PROFILE_IMAGE_BYTES;
use cv_forge::wizard::{GatePolicy, Transition, WizardStep};

// =====================================================================
// Helpers
// =====================================================================

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

#[derive(Default)]
struct Recorder(Mutex<Vec<Notice>>);

impl Recorder {
    fn notices(&self) -> Vec<Notice> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

fn solid(width: u32, height: u32, scale: f32) -> RasterImage {
    RasterImage::new(RgbaImage::from_pixel(width, height, Rgba([240, 240, 250, 255])), scale)
}

/// Returns a solid raster of a fixed size regardless of the surface.
struct FixedRasterizer {
    width: u32,
    height: u32,
}

impl Rasterizer for FixedRasterizer {
    fn rasterize(
        &self,
        _surface: Surface,
        scale: f32,
    ) -> impl Future<Output = Result<RasterImage, RenderError>> + Send {
        let (width, height) = (self.width, self.height);
        async move { Ok(solid(width, height, scale)) }
    }
}

struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(
        &self,
        _surface: Surface,
        _scale: f32,
    ) -> impl Future<Output = Result<RasterImage, RenderError>> + Send {
        async { Err(RenderError::Layout("surface has no root".to_string())) }
    }
}

/// Records the header name of every surface it receives, then waits for
/// the gate before producing a raster.
#[derive(Clone)]
struct GatedRasterizer {
    gate: Arc<Notify>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl GatedRasterizer {
    fn new() -> Self {
        Self {
            gate: Arc::new(Notify::new()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Rasterizer for GatedRasterizer {
    fn rasterize(
        &self,
        surface: Surface,
        scale: f32,
    ) -> impl Future<Output = Result<RasterImage, RenderError>> + Send {
        let gate = Arc::clone(&self.gate);
        let seen = Arc::clone(&self.seen);
        async move {
            seen.lock().unwrap().push(surface.tree.header.name.clone());
            gate.notified().await;
            Ok(solid(400, 300, scale))
        }
    }
}

fn jane_surface() -> Surface {
    Surface {
        tree: project(&samples::jane_doe(), TemplateChoice::Modern),
        width_px: 794.0,
    }
}

fn session_with<R: Rasterizer>(
    content: cv_forge::CvContent,
    config: SessionConfig,
    rasterizer: R,
) -> (Session<R>, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let doc = CvDocument::from_content(content).unwrap();
    let session = Session::with_document(
        doc,
        config,
        rasterizer,
        Arc::clone(&recorder) as Arc<dyn Notifier>,
    );
    (session, recorder)
}

// =====================================================================
// Example scenarios
// =====================================================================

#[tokio::test]
async fn jane_doe_exports_named_pdf_with_present_range() {
    let (mut session, recorder) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );

    let tree = session.render_tree().clone();
    let ranges: Vec<&str> = tree
        .sections
        .iter()
        .filter_map(|s| match s {
            Section::Experience { entries } => Some(entries),
            _ => None,
        })
        .flatten()
        .map(|e| e.date_range.as_str())
        .collect();
    assert_eq!(ranges, ["January 2020 \u{2013} Present"]);

    let file = session.export().await.unwrap();
    assert_eq!(file.file_name, "CV_Jane_Doe.pdf");
    assert_eq!(file.pages(), 1);
    assert_valid_pdf(&file.bytes);
    assert!(!session.pipeline().is_busy());

    let notices = recorder.notices();
    assert_eq!(
        notices.first(),
        Some(&Notice::ExportStarted {
            file_name: "CV_Jane_Doe.pdf".into(),
        })
    );
    assert!(matches!(
        notices.last(),
        Some(Notice::ExportFinished { pages: 1, .. })
    ));
}

#[tokio::test]
async fn duplicate_skill_keeps_single_entry() {
    let (mut session, recorder) = session_with(
        samples::minimal(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    assert_eq!(session.add_skill("Go"), EditOutcome::Applied);
    assert_eq!(session.add_skill(" Go "), EditOutcome::Duplicate);
    assert_eq!(session.document().skills(), ["Go"]);
    assert_eq!(recorder.notices(), [Notice::DuplicateSkill("Go".into())]);
}

#[tokio::test]
async fn empty_name_uses_fallback_file_name() {
    let (mut session, _) = session_with(
        Default::default(),
        SessionConfig::default(),
        FixedRasterizer {
            width: 380,
            height: 200,
        },
    );
    let file = session.export().await.unwrap();
    assert_eq!(file.file_name, "CV_Professional.pdf");
}

// =====================================================================
// Session wiring
// =====================================================================

#[test]
fn wizard_gate_blocks_until_personal_info_complete() {
    let (mut session, _) = session_with(
        Default::default(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    session.set_personal_info(PersonalField::FullName, "Jane Doe");
    session.set_personal_info(PersonalField::Position, "Engineer");
    assert!(matches!(session.next_step(), Transition::Blocked { .. }));
    assert_eq!(session.wizard().step(), WizardStep::FIRST);

    session.set_personal_info(PersonalField::Email, "jane@example.com");
    assert!(session.wizard().is_complete(WizardStep::FIRST));
    assert!(matches!(session.next_step(), Transition::Moved { .. }));
    assert_eq!(session.wizard().step().number(), 2);

    assert!(matches!(session.jump_to_step(99), Transition::Moved { .. }));
    assert_eq!(session.wizard().step().number(), 5);
    assert!((session.wizard().progress_percent() - 100.0).abs() < 1e-4);
    assert_eq!(session.next_step(), Transition::Unchanged);
}

#[test]
fn advisory_gate_never_blocks() {
    let config = SessionConfig {
        gate_policy: GatePolicy::Advisory,
        ..SessionConfig::default()
    };
    let (mut session, recorder) =
        session_with(Default::default(), config, LayoutRasterizer::default());
    assert!(matches!(session.next_step(), Transition::Moved { .. }));
    assert!(recorder.notices().is_empty());
}

#[test]
fn preview_recomputes_only_on_change() {
    let (mut session, _) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    let first = session.render_tree().clone();
    let second = session.render_tree().clone();
    assert_eq!(first, second);
    assert_eq!(session.preview().projection_count(), 1);

    // A write of the current value is not a change.
    session.set_personal_info(PersonalField::FullName, "Jane Doe");
    session.render_tree();
    assert_eq!(session.preview().projection_count(), 1);

    session.set_summary("Builds compilers.");
    session.render_tree();
    assert_eq!(session.preview().projection_count(), 2);

    assert!(session.select_template(TemplateChoice::Creative));
    assert_eq!(session.render_tree().template, TemplateChoice::Creative);
    assert_eq!(session.preview().projection_count(), 3);
}

#[test]
fn work_experience_order_survives_removal() {
    let (mut session, _) = session_with(
        Default::default(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    let ids: Vec<_> = (0..4).map(|_| session.add_work_experience()).collect();
    for (i, id) in ids.iter().enumerate() {
        session.update_work_experience(*id, ExperienceField::Company, format!("Co {i}"));
    }
    session.remove_work_experience(ids[1]);
    let fresh = session.add_work_experience();
    assert!(!ids.contains(&fresh));

    let order: Vec<_> = session.document().work_experience().iter().map(|e| e.id).collect();
    assert_eq!(order, [ids[0], ids[2], ids[3], fresh]);
}

// =====================================================================
// Single-flight and snapshot tests
// =====================================================================

#[tokio::test]
async fn second_export_rejected_while_first_in_flight() {
    let rasterizer = GatedRasterizer::new();
    let gate = Arc::clone(&rasterizer.gate);
    let pipeline = Arc::new(ExportPipeline::new(rasterizer, ExportConfig::default()));

    let job = pipeline.begin(Some(jane_surface()), "Jane Doe").unwrap();
    assert!(pipeline.is_busy());
    assert!(matches!(
        pipeline.begin(Some(jane_surface()), "Jane Doe"),
        Err(ExportError::InProgress)
    ));

    let handle = tokio::spawn(job.run());
    tokio::task::yield_now().await;
    assert!(pipeline.is_busy());
    assert!(matches!(
        pipeline.export(Some(jane_surface()), "Jane Doe").await,
        Err(ExportError::InProgress)
    ));

    gate.notify_one();
    let file = handle.await.unwrap().unwrap();
    assert_eq!(file.file_name, "CV_Jane_Doe.pdf");
    assert!(!pipeline.is_busy());
    assert_eq!(pipeline.rasterizer().seen.lock().unwrap().len(), 1);

    // The slot is free again.
    gate.notify_one();
    pipeline.export(Some(jane_surface()), "Jane Doe").await.unwrap();
}

#[tokio::test]
async fn edits_after_begin_do_not_reach_the_export() {
    let rasterizer = GatedRasterizer::new();
    let gate = Arc::clone(&rasterizer.gate);
    let seen = Arc::clone(&rasterizer.seen);
    let (mut session, _) = session_with(samples::jane_doe(), SessionConfig::default(), rasterizer);

    let job = session.begin_export().unwrap();
    session.set_personal_info(PersonalField::FullName, "Changed Name");
    session.set_summary("Edited while exporting.");

    gate.notify_one();
    let file = job.run().await.unwrap();
    assert_eq!(file.file_name, "CV_Jane_Doe.pdf");
    assert_eq!(seen.lock().unwrap().as_slice(), ["Jane Doe"]);
    assert_eq!(session.render_tree().header.name, "Changed Name");
}

#[tokio::test]
async fn dropped_job_releases_the_slot() {
    let pipeline = ExportPipeline::new(
        FixedRasterizer {
            width: 100,
            height: 100,
        },
        ExportConfig::default(),
    );
    let job = pipeline.begin(Some(jane_surface()), "").unwrap();
    assert!(pipeline.is_busy());
    drop(job);
    assert!(!pipeline.is_busy());
}

#[tokio::test]
async fn missing_surface_never_starts() {
    let recorder = Arc::new(Recorder::default());
    let pipeline = ExportPipeline::with_notifier(
        FixedRasterizer {
            width: 100,
            height: 100,
        },
        ExportConfig::default(),
        Arc::clone(&recorder) as Arc<dyn Notifier>,
    );
    assert!(matches!(
        pipeline.export(None, "Jane Doe").await,
        Err(ExportError::SurfaceUnavailable)
    ));
    assert!(!pipeline.is_busy());
    assert!(matches!(
        recorder.notices().as_slice(),
        [Notice::ExportRejected(_)]
    ));
}

#[tokio::test]
async fn failed_export_is_generic_and_clears_the_flag() {
    let (mut session, recorder) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        FailingRasterizer,
    );
    for _ in 0..2 {
        assert!(matches!(session.export().await, Err(ExportError::Failed)));
        assert!(!session.pipeline().is_busy());
    }
    let failures = recorder
        .notices()
        .into_iter()
        .filter(|n| *n == Notice::ExportFailed)
        .count();
    assert_eq!(failures, 2);
}

// =====================================================================
// Pagination tests
// =====================================================================

#[tokio::test]
async fn tall_raster_spans_ceil_pages() {
    // 1900 px across 190 mm gives 2770 rows per page.
    let (mut session, _) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        FixedRasterizer {
            width: 1900,
            height: 6000,
        },
    );
    let file = session.export().await.unwrap();
    assert_eq!(file.pages(), 3);
    assert_valid_pdf(&file.bytes);
    assert_slices_tile(&file.plan);
}

#[tokio::test]
async fn long_career_paginates_instead_of_clipping() {
    let (mut session, _) = session_with(
        samples::long_career(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    let file = session.export().await.unwrap();
    assert!(file.pages() >= 2, "expected multiple pages, got {}", file.pages());
    assert_eq!(file.file_name, "CV_Alex_Morgan_Reyes.pdf");
    assert_slices_tile(&file.plan);

    let plan = DocumentPlan::from_json(&file.plan.to_json().unwrap()).unwrap();
    assert_eq!(plan, file.plan);
}

fn assert_slices_tile(plan: &DocumentPlan) {
    let usable_h = plan.page_height_mm - 2.0 * plan.margin_mm;
    let mut next = 0;
    for page in &plan.pages {
        assert_eq!(page.source_top_px, next, "gap or overlap at page {}", page.page_index);
        assert_eq!((page.x_mm, page.y_mm), (plan.margin_mm, plan.margin_mm));
        assert!(page.height_mm <= usable_h + 1e-3);
        next = page.source_bottom_px();
    }
    assert_eq!(next, plan.source_height_px);
}

// =====================================================================
// Rasterisation stability test
// =====================================================================

#[test]
fn rasterisation_is_deterministic() {
    let fonts = FontManager::default();
    let digest = |template| {
        let surface = Surface {
            tree: project(&samples::jane_doe(), template),
            width_px: 600.0,
        };
        let raster = paint_surface(&surface, 2.0, &fonts).unwrap();
        Sha256::digest(raster.pixels().as_raw())
    };
    for template in TemplateChoice::ALL {
        assert_eq!(digest(template), digest(template), "{template}");
    }
    assert_ne!(digest(TemplateChoice::Modern), digest(TemplateChoice::Classic));
}

// =====================================================================
// Profile image upload tests
// =====================================================================

#[tokio::test]
async fn oversized_upload_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.jpg");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_PROFILE_IMAGE_BYTES + 1).unwrap();

    let (mut session, recorder) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    let revision = session.document().revision();
    assert!(matches!(
        session.upload_profile_image(&path).await,
        Err(UploadError::TooLarge { .. })
    ));
    assert_eq!(session.document().revision(), revision);
    assert!(session.document().personal_info().profile_image.is_none());
    assert!(matches!(
        recorder.notices().as_slice(),
        [Notice::ProfileImageRejected(_)]
    ));
}

#[tokio::test]
async fn uploaded_photo_is_rendered_and_exported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("me.png");
    RgbaImage::from_pixel(32, 32, Rgba([200, 80, 40, 255]))
        .save(&path)
        .unwrap();

    let (mut session, _) = session_with(
        samples::jane_doe(),
        SessionConfig::default(),
        LayoutRasterizer::default(),
    );
    assert_eq!(
        session.upload_profile_image(&path).await.unwrap(),
        EditOutcome::Applied
    );
    assert!(matches!(session.render_tree().header.avatar, Avatar::Image(_)));

    let file = session.export().await.unwrap();
    let saved = file.save(dir.path()).await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "CV_Jane_Doe.pdf");
    assert_valid_pdf(&std::fs::read(saved).unwrap());
}
