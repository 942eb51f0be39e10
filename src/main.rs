//! cvforge – command-line CV exporter.
//!
//! Usage:
//!   cvforge <cv.json> [out_dir] [--template T] [--font F] [--config C] [--plan]
//!   cvforge --demo <name> [out_dir] [...]
//!
//! The PDF is written to `out_dir` (default: the current directory) as
//! `CV_<Full_Name>.pdf`.

use std::{env, fs, path::PathBuf, process, sync::Arc};

use cv_forge::document::{CvDocument, PersonalField};
use cv_forge::fonts::{FontKey, FontManager};
use cv_forge::raster::LayoutRasterizer;
use cv_forge::samples;
use cv_forge::session::{LogNotifier, Session, SessionConfig};
use cv_forge::template::TemplateChoice;

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut positional: Vec<PathBuf> = Vec::new();
    let mut template: Option<TemplateChoice> = None;
    let mut font_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut demo: Option<String> = None;
    let mut print_plan = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--template" | "-t" => {
                let Some(v) = iter.next() else { fail("--template needs a value") };
                template = Some(v.parse().unwrap_or_else(|e| fail(e)));
            }
            "--font" | "-f" => match iter.next() {
                Some(v) => font_path = Some(PathBuf::from(v)),
                None => fail("--font needs a path"),
            },
            "--config" | "-c" => match iter.next() {
                Some(v) => config_path = Some(PathBuf::from(v)),
                None => fail("--config needs a path"),
            },
            "--demo" => match iter.next() {
                Some(v) => demo = Some(v.clone()),
                None => fail(format!("--demo needs one of {}", samples::NAMES.join(", "))),
            },
            "--plan" => print_plan = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => positional.push(PathBuf::from(path)),
        }
    }

    let mut positional = positional.into_iter();
    let document = match &demo {
        Some(name) => {
            let content = samples::by_name(name).unwrap_or_else(|| {
                fail(format!(
                    "unknown demo {name:?}, expected one of {}",
                    samples::NAMES.join(", ")
                ))
            });
            CvDocument::from_content(content).unwrap_or_else(|e| fail(e))
        }
        None => {
            let Some(input) = positional.next() else {
                eprintln!("Error: no input file specified.");
                print_usage(&args[0]);
                process::exit(1);
            };
            CvDocument::from_file(&input)
                .unwrap_or_else(|e| fail(format!("loading '{}': {e}", input.display())))
        }
    };
    let out_dir = positional.next().unwrap_or_else(|| PathBuf::from("."));
    if let Some(extra) = positional.next() {
        eprintln!("Unexpected argument: {}", extra.display());
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut config = match &config_path {
        Some(path) => SessionConfig::from_file(path)
            .unwrap_or_else(|e| fail(format!("config '{}': {e}", path.display()))),
        None => SessionConfig::default(),
    };
    if let Some(t) = template {
        config.template = t;
    }

    let mut fonts = FontManager::default();
    if let Some(path) = &font_path {
        let bytes = fs::read(path)
            .unwrap_or_else(|e| fail(format!("reading '{}': {e}", path.display())));
        if let Err(e) = fonts.load_font(FontKey::REGULAR, bytes) {
            fail(e);
        }
    }

    let rasterizer = LayoutRasterizer::new(Arc::new(fonts));
    let mut session = Session::with_document(document, config, rasterizer, Arc::new(LogNotifier));
    if PersonalField::FullName.get(session.document().personal_info()).is_empty() {
        log::warn!("CV has no full name, using the fallback file name");
    }

    let file = match session.export().await {
        Ok(file) => file,
        Err(e) => fail(e),
    };

    if let Err(e) = fs::create_dir_all(&out_dir) {
        fail(format!("creating output directory: {e}"));
    }
    let path = match file.save(&out_dir).await {
        Ok(path) => path,
        Err(e) => fail(format!("writing into '{}': {e}", out_dir.display())),
    };

    if print_plan {
        match file.plan.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => fail(format!("serialising the page plan: {e}")),
        }
    }
    let pages = file.pages();
    eprintln!(
        "Wrote '{}' ({} bytes, {} page{})",
        path.display(),
        file.bytes.len(),
        pages,
        if pages == 1 { "" } else { "s" }
    );
}

fn print_usage(prog: &str) {
    eprintln!("cvforge – CV to PDF exporter (cv-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <cv.json> [out_dir] [--template T] [--font F] [--config C] [--plan]");
    eprintln!("  {prog} --demo <name> [out_dir] [...]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <cv.json>      CV content (camelCase JSON)");
    eprintln!("  [out_dir]      Output directory (default: current directory)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --template, -t modern | classic | creative (default: modern)");
    eprintln!("  --font, -f     TTF/OTF face for real glyph outlines");
    eprintln!("  --config, -c   Session config JSON (gate policy, viewport, export)");
    eprintln!("  --demo         Built-in sample: {}", samples::NAMES.join(", "));
    eprintln!("  --plan         Print the page plan as JSON on stdout");
    eprintln!("  --help         Print this message");
}
