//! Pipeline – ties together rasterisation, pagination, and PDF rendering
//! behind a single-flight export guard.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ExportError, RenderError};
use crate::layout_config::DocumentPlan;
use crate::pagination::paginate;
use crate::preview::Surface;
use crate::raster::Rasterizer;
use crate::render::render_pdf;
use crate::session::{LogNotifier, Notice, Notifier};

/// Configuration for the export pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Document title embedded in the PDF metadata (default: "Curriculum Vitae").
    pub title: String,
    /// Page width in millimetres (default: A4 = 210).
    pub page_width_mm: f32,
    /// Page height in millimetres (default: A4 = 297).
    pub page_height_mm: f32,
    /// Uniform page margin in millimetres (default: 10).
    pub margin_mm: f32,
    /// Supersampling factor for rasterisation (default: 2).
    pub scale: f32,
    /// File extension of the exported document, without the dot.
    pub extension: String,
    pub file_prefix: String,
    /// Name used in the file name when the CV has no full name.
    pub fallback_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: "Curriculum Vitae".to_string(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
            scale: 2.0,
            extension: "pdf".to_string(),
            file_prefix: "CV".to_string(),
            fallback_name: "Professional".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn usable_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    pub fn usable_height_mm(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.page_width_mm) || !positive(self.page_height_mm) {
            return Err(ConfigError::Invalid(format!(
                "page size must be positive, got {}x{} mm",
                self.page_width_mm, self.page_height_mm
            )));
        }
        if !positive(self.scale) {
            return Err(ConfigError::Invalid(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !(self.margin_mm.is_finite() && self.margin_mm >= 0.0)
            || !positive(self.usable_width_mm())
            || !positive(self.usable_height_mm())
        {
            return Err(ConfigError::Invalid(format!(
                "a {} mm margin leaves no usable area on a {}x{} mm page",
                self.margin_mm, self.page_width_mm, self.page_height_mm
            )));
        }
        Ok(())
    }
}

/// `CV_<Full_Name>.pdf`: each whitespace run becomes one underscore; an
/// empty name falls back to the configured placeholder.
///
/// The result is always a single path component. Separators, NUL and other
/// control characters become `_`, as do leading dots.
pub fn export_file_name(full_name: &str, config: &ExportConfig) -> String {
    let words: Vec<&str> = full_name.split_whitespace().collect();
    let name = if words.is_empty() {
        config.fallback_name.clone()
    } else {
        words.join("_")
    };
    let raw = format!("{}_{}.{}", config.file_prefix, name, config.extension);
    let mut sanitized: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let dots = sanitized.len() - sanitized.trim_start_matches('.').len();
    sanitized.replace_range(..dots, &"_".repeat(dots));
    sanitized
}

fn is_single_component(file_name: &str) -> bool {
    Path::new(file_name).file_name() == Some(OsStr::new(file_name))
}

/// Clears the in-flight flag when dropped.
struct FlightGuard(Arc<AtomicBool>);

impl FlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Exporter that allows one export in flight at a time.
pub struct ExportPipeline<R: Rasterizer> {
    rasterizer: Arc<R>,
    config: ExportConfig,
    in_flight: Arc<AtomicBool>,
    notifier: Arc<dyn Notifier>,
}

impl<R: Rasterizer> ExportPipeline<R> {
    pub fn new(rasterizer: R, config: ExportConfig) -> Self {
        Self::with_notifier(rasterizer, config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(rasterizer: R, config: ExportConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            config,
            in_flight: Arc::new(AtomicBool::new(false)),
            notifier,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Whether an export job currently holds the flight guard.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Capture `surface` and claim the flight guard.
    ///
    /// Everything the job needs is owned by the returned [`ExportJob`], so
    /// later edits to the document never reach it.
    pub fn begin(
        &self,
        surface: Option<Surface>,
        full_name: &str,
    ) -> Result<ExportJob<R>, ExportError> {
        let Some(surface) = surface else {
            log::warn!("export requested with no surface attached");
            self.notifier.notify(Notice::ExportRejected(
                ExportError::SurfaceUnavailable.to_string(),
            ));
            return Err(ExportError::SurfaceUnavailable);
        };
        let Some(guard) = FlightGuard::acquire(&self.in_flight) else {
            log::warn!("export requested while another is in flight");
            self.notifier
                .notify(Notice::ExportRejected(ExportError::InProgress.to_string()));
            return Err(ExportError::InProgress);
        };

        let file_name = export_file_name(full_name, &self.config);
        log::info!("starting export of {file_name}");
        self.notifier.notify(Notice::ExportStarted {
            file_name: file_name.clone(),
        });

        Ok(ExportJob {
            guard,
            surface,
            file_name,
            rasterizer: Arc::clone(&self.rasterizer),
            config: self.config.clone(),
            notifier: Arc::clone(&self.notifier),
        })
    }

    /// [`begin`](Self::begin) and run to completion.
    pub async fn export(
        &self,
        surface: Option<Surface>,
        full_name: &str,
    ) -> Result<ExportedFile, ExportError> {
        self.begin(surface, full_name)?.run().await
    }
}

/// A captured export waiting to run. Holds the flight guard until it
/// finishes or is dropped.
pub struct ExportJob<R: Rasterizer> {
    guard: FlightGuard,
    surface: Surface,
    file_name: String,
    rasterizer: Arc<R>,
    config: ExportConfig,
    notifier: Arc<dyn Notifier>,
}

impl<R: Rasterizer> ExportJob<R> {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Rasterise, paginate and serialise.
    ///
    /// Failures are logged and reported as [`ExportError::Failed`]; no bytes
    /// are returned unless every stage succeeded.
    pub async fn run(self) -> Result<ExportedFile, ExportError> {
        let ExportJob {
            guard,
            surface,
            file_name,
            rasterizer,
            config,
            notifier,
        } = self;

        let result = produce(&*rasterizer, surface, &config).await;
        drop(guard);

        match result {
            Ok((bytes, plan)) => {
                log::info!(
                    "exported {file_name}: {} page(s), {} bytes",
                    plan.page_count(),
                    bytes.len()
                );
                notifier.notify(Notice::ExportFinished {
                    file_name: file_name.clone(),
                    pages: plan.page_count(),
                    bytes: bytes.len(),
                });
                Ok(ExportedFile {
                    file_name,
                    bytes,
                    plan,
                })
            }
            Err(e) => {
                log::error!("export of {file_name} failed: {e}");
                notifier.notify(Notice::ExportFailed);
                Err(ExportError::Failed)
            }
        }
    }
}

async fn produce<R: Rasterizer>(
    rasterizer: &R,
    surface: Surface,
    config: &ExportConfig,
) -> Result<(Vec<u8>, DocumentPlan), RenderError> {
    config.validate()?;
    let raster = rasterizer.rasterize(surface, config.scale).await?;
    let plan = paginate(raster.width(), raster.height(), config)?;
    tokio::task::spawn_blocking(move || render_pdf(&plan, &raster).map(|bytes| (bytes, plan)))
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub plan: DocumentPlan,
}

impl ExportedFile {
    pub fn pages(&self) -> usize {
        self.plan.page_count()
    }

    /// Write the document into `dir` under its file name.
    ///
    /// The bytes go to a sibling `.part` file first, so a failed write never
    /// leaves a truncated document under the final name. A file name that is
    /// not a single path component is rejected with `InvalidInput`.
    pub async fn save(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        if !is_single_component(&self.file_name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to save outside the output directory: {:?}", self.file_name),
            ));
        }
        let path = dir.as_ref().join(&self.file_name);
        let partial = dir.as_ref().join(format!("{}.part", self.file_name));
        tokio::fs::write(&partial, &self.bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        log::info!("wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_full_name() {
        let cfg = ExportConfig::default();
        assert_eq!(export_file_name("Jane Doe", &cfg), "CV_Jane_Doe.pdf");
        assert_eq!(export_file_name("  Ana  Maria Lopez ", &cfg), "CV_Ana_Maria_Lopez.pdf");
        assert_eq!(export_file_name("", &cfg), "CV_Professional.pdf");
        assert_eq!(export_file_name("   ", &cfg), "CV_Professional.pdf");
    }

    #[test]
    fn file_name_never_contains_path_separators() {
        let cfg = ExportConfig::default();
        assert_eq!(export_file_name("Ann/Lee", &cfg), "CV_Ann_Lee.pdf");
        assert_eq!(export_file_name("a/../../escaped", &cfg), "CV_a_.._.._escaped.pdf");
        assert_eq!(export_file_name("C:\\temp\0x", &cfg), "CV_C:_temp_x.pdf");
        for name in ["Ann/Lee", "a/../../escaped", "..", "x\\y"] {
            assert!(is_single_component(&export_file_name(name, &cfg)), "{name}");
        }

        let bare = ExportConfig {
            file_prefix: "..".to_string(),
            ..ExportConfig::default()
        };
        assert_eq!(export_file_name("x", &bare), "___x.pdf");
    }

    fn exported(file_name: String) -> ExportedFile {
        let cfg = ExportConfig::default();
        ExportedFile {
            file_name,
            bytes: b"%PDF-1.7".to_vec(),
            plan: paginate(190, 10, &cfg).unwrap(),
        }
    }

    #[tokio::test]
    async fn save_stays_inside_output_directory() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        tokio::fs::create_dir(&out).await.unwrap();

        let cfg = ExportConfig::default();
        for name in ["Ann/Lee", "a/../../escaped"] {
            let path = exported(export_file_name(name, &cfg)).save(&out).await.unwrap();
            assert_eq!(path.parent(), Some(out.as_path()));
            assert!(path.is_file());
        }
        assert!(!root.path().join("escaped.pdf").exists());

        let err = exported("../escaped.pdf".to_string()).save(&out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(!root.path().join("escaped.pdf").exists());
    }

    #[test]
    fn default_config_is_a4_with_10mm_margin() {
        let cfg = ExportConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.usable_width_mm(), 190.0);
        assert_eq!(cfg.usable_height_mm(), 277.0);
        assert_eq!(cfg.scale, 2.0);
    }

    #[test]
    fn config_validation() {
        let bad_scale = ExportConfig {
            scale: 0.0,
            ..ExportConfig::default()
        };
        assert!(bad_scale.validate().is_err());
        let bad_margin = ExportConfig {
            margin_mm: 105.0,
            ..ExportConfig::default()
        };
        assert!(bad_margin.validate().is_err());
        let negative_margin = ExportConfig {
            margin_mm: -1.0,
            ..ExportConfig::default()
        };
        assert!(negative_margin.validate().is_err());
    }

    #[test]
    fn config_from_partial_json() {
        let cfg: ExportConfig = serde_json::from_str(r#"{"margin_mm": 15.0}"#).unwrap();
        assert_eq!(cfg.margin_mm, 15.0);
        assert_eq!(cfg.page_width_mm, 210.0);
        assert_eq!(cfg.file_prefix, "CV");
    }

    #[test]
    fn flight_guard_is_exclusive_and_released_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let first = FlightGuard::acquire(&flag).unwrap();
        assert!(FlightGuard::acquire(&flag).is_none());
        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(FlightGuard::acquire(&flag).is_some());
    }
}
