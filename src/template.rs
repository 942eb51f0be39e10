//! Template selection and the visual theme each template maps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the fixed rendering styles. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateChoice {
    #[default]
    Modern,
    Classic,
    Creative,
}

impl TemplateChoice {
    pub const ALL: [TemplateChoice; 3] = [
        TemplateChoice::Modern,
        TemplateChoice::Classic,
        TemplateChoice::Creative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplateChoice::Modern => "modern",
            TemplateChoice::Classic => "classic",
            TemplateChoice::Creative => "creative",
        }
    }
}

impl fmt::Display for TemplateChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TemplateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "modern" => Ok(TemplateChoice::Modern),
            "classic" => Ok(TemplateChoice::Classic),
            "creative" => Ok(TemplateChoice::Creative),
            other => Err(format!(
                "unknown template {other:?} (expected modern, classic or creative)"
            )),
        }
    }
}

/// Holds the current template; any choice may follow any other.
#[derive(Debug, Clone, Default)]
pub struct TemplateSelector {
    current: TemplateChoice,
}

impl TemplateSelector {
    pub fn new(initial: TemplateChoice) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> TemplateChoice {
        self.current
    }

    /// Returns `true` if the selection changed.
    pub fn select(&mut self, choice: TemplateChoice) -> bool {
        if self.current == choice {
            return false;
        }
        log::info!("template {} -> {}", self.current, choice);
        self.current = choice;
        true
    }
}

// ---------------------------------------------------------------------------
// Colours and themes
// ---------------------------------------------------------------------------

/// RGBA colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `#rrggbb` or `#rgb`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').filter(|h| h.is_ascii())?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let d = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Some(Self::rgb(d(0)?, d(1)?, d(2)?))
            }
            _ => None,
        }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAlign {
    Center,
    Left,
}

/// How the skills section is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillStyle {
    /// Bordered chips that wrap across lines.
    Chips,
    /// A single comma-separated paragraph.
    Inline,
}

/// Colours and typography for one template.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub rule: Color,
    pub header_background: Option<Color>,
    pub header_text: Color,
    pub header_align: HeaderAlign,
    /// Draw a rule under the header.
    pub header_rule: bool,
    /// Draw a rule under each section title.
    pub section_rule: bool,
    pub uppercase_titles: bool,
    pub skill_style: SkillStyle,
    pub chip_background: Color,
    pub padding: f32,
    pub section_gap: f32,
    pub name_size: f32,
    pub title_size: f32,
    pub body_size: f32,
    pub small_size: f32,
    pub line_height: f32,
    pub avatar_size: f32,
}

impl Theme {
    pub fn for_choice(choice: TemplateChoice) -> Self {
        match choice {
            TemplateChoice::Modern => Self::modern(),
            TemplateChoice::Classic => Self::classic(),
            TemplateChoice::Creative => Self::creative(),
        }
    }

    fn modern() -> Self {
        let accent = Color::rgb(0.145, 0.388, 0.922); // #2563eb
        Self {
            background: Color::WHITE,
            text: Color::rgb(0.067, 0.094, 0.153),
            muted: Color::rgb(0.42, 0.447, 0.502),
            accent,
            rule: Color::rgb(0.898, 0.906, 0.922),
            header_background: None,
            header_text: Color::rgb(0.067, 0.094, 0.153),
            header_align: HeaderAlign::Center,
            header_rule: true,
            section_rule: false,
            uppercase_titles: true,
            skill_style: SkillStyle::Chips,
            chip_background: accent.with_alpha(0.12),
            padding: 32.0,
            section_gap: 18.0,
            name_size: 22.0,
            title_size: 13.0,
            body_size: 11.0,
            small_size: 9.5,
            line_height: 1.45,
            avatar_size: 64.0,
        }
    }

    fn classic() -> Self {
        Self {
            background: Color::WHITE,
            text: Color::BLACK,
            muted: Color::rgb(0.33, 0.33, 0.33),
            accent: Color::BLACK,
            rule: Color::rgb(0.2, 0.2, 0.2),
            header_background: None,
            header_text: Color::BLACK,
            header_align: HeaderAlign::Left,
            header_rule: true,
            section_rule: true,
            uppercase_titles: true,
            skill_style: SkillStyle::Inline,
            chip_background: Color::TRANSPARENT,
            padding: 40.0,
            section_gap: 16.0,
            name_size: 24.0,
            title_size: 12.0,
            body_size: 11.0,
            small_size: 10.0,
            line_height: 1.4,
            avatar_size: 56.0,
        }
    }

    fn creative() -> Self {
        let accent = Color::rgb(0.486, 0.227, 0.929); // #7c3aed
        Self {
            background: Color::rgb(0.98, 0.976, 1.0),
            text: Color::rgb(0.118, 0.106, 0.294),
            muted: Color::rgb(0.42, 0.4, 0.55),
            accent,
            rule: accent.with_alpha(0.3),
            header_background: Some(accent),
            header_text: Color::WHITE,
            header_align: HeaderAlign::Center,
            header_rule: false,
            section_rule: false,
            uppercase_titles: false,
            skill_style: SkillStyle::Chips,
            chip_background: accent.with_alpha(0.18),
            padding: 28.0,
            section_gap: 20.0,
            name_size: 26.0,
            title_size: 15.0,
            body_size: 11.0,
            small_size: 9.5,
            line_height: 1.5,
            avatar_size: 72.0,
        }
    }
}
