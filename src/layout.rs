//! Surface layout – uses Taffy to lay out a [`RenderTree`] as a stack of
//! flexbox columns, then extracts a tree of positioned boxes in surface
//! pixels (origin top-left, y down).

use std::collections::HashMap;
use taffy::prelude::*;

use crate::error::RenderError;
use crate::fonts::{wrap_text, FontKey, FontManager};
use crate::preview::{Avatar, Header, RenderTree, Section, Surface};
use crate::template::{Color, HeaderAlign, SkillStyle, Theme};

// ---------------------------------------------------------------------------
// Output tree
// ---------------------------------------------------------------------------

/// A box in surface coordinates.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub background: Option<Color>,
    pub border: Option<Border>,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone, Copy)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text(TextBlock),
    /// Data-URI image, optionally clipped to a circle.
    Image { src: String, round: bool },
    /// Generic person glyph shown when no photo is uploaded.
    AvatarPlaceholder { color: Color },
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    pub key: FontKey,
    pub color: Color,
    pub line_height: f32,
}

#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    /// X offset within the box (alignment).
    pub x_offset: f32,
}

/// Laid-out surface.
#[derive(Debug, Clone)]
pub struct SurfaceLayout {
    pub width: f32,
    pub height: f32,
    pub root: PositionedBox,
}

impl PositionedBox {
    /// Depth-first visit of this box and all descendants.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a PositionedBox)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Default)]
struct Paint {
    background: Option<Color>,
    border: Option<Border>,
    content: Option<BoxContent>,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    theme: Theme,
    paint: HashMap<NodeId, Paint>,
}

fn layout_err(e: taffy::TaffyError) -> RenderError {
    RenderError::Layout(e.to_string())
}

fn uniform(v: f32) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(v),
        right: LengthPercentage::Length(v),
        bottom: LengthPercentage::Length(v),
        left: LengthPercentage::Length(v),
    }
}

fn padding(vertical: f32, horizontal: f32) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(vertical),
        right: LengthPercentage::Length(horizontal),
        bottom: LengthPercentage::Length(vertical),
        left: LengthPercentage::Length(horizontal),
    }
}

fn margin_top(v: f32) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(v),
        right: LengthPercentageAuto::Length(0.0),
        bottom: LengthPercentageAuto::Length(0.0),
        left: LengthPercentageAuto::Length(0.0),
    }
}

fn column_style(gap: f32, align: Align) -> Style {
    Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        align_items: Some(match align {
            Align::Left => taffy::AlignItems::Start,
            Align::Center => taffy::AlignItems::Center,
        }),
        gap: Size {
            width: LengthPercentage::Length(0.0),
            height: LengthPercentage::Length(gap),
        },
        ..Default::default()
    }
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, theme: Theme) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            theme,
            paint: HashMap::new(),
        }
    }

    /// Wrapped text leaf. Centered text takes the full `max_width` so each
    /// line can be offset individually; left-aligned text shrinks to fit.
    /// Blank text produces no node.
    fn text(
        &mut self,
        text: &str,
        font_size: f32,
        key: FontKey,
        color: Color,
        max_width: f32,
        align: Align,
    ) -> Result<Option<NodeId>, RenderError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let line_height = self.fonts.line_height_px(font_size, self.theme.line_height);
        let wrapped = wrap_text(text, font_size, key, max_width, self.fonts);
        let widths: Vec<f32> = wrapped
            .iter()
            .map(|l| self.fonts.text_width(l, font_size, key))
            .collect();
        let natural = widths.iter().copied().fold(0.0f32, f32::max).min(max_width);
        let box_width = match align {
            Align::Left => natural,
            Align::Center => max_width,
        };

        let lines = wrapped
            .into_iter()
            .zip(widths)
            .map(|(text, w)| TextLine {
                text,
                x_offset: match align {
                    Align::Left => 0.0,
                    Align::Center => ((box_width - w) / 2.0).max(0.0),
                },
            })
            .collect::<Vec<_>>();
        let height = lines.len() as f32 * line_height;

        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width: Dimension::Length(box_width),
                    height: Dimension::Length(height),
                },
                flex_shrink: 0.0,
                ..Default::default()
            })
            .map_err(layout_err)?;
        self.paint.insert(
            node,
            Paint {
                content: Some(BoxContent::Text(TextBlock {
                    lines,
                    font_size,
                    key,
                    color,
                    line_height,
                })),
                ..Default::default()
            },
        );
        Ok(Some(node))
    }

    fn fixed(
        &mut self,
        width: Dimension,
        height: f32,
        paint: Paint,
    ) -> Result<NodeId, RenderError> {
        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width,
                    height: Dimension::Length(height),
                },
                flex_shrink: 0.0,
                ..Default::default()
            })
            .map_err(layout_err)?;
        self.paint.insert(node, paint);
        Ok(node)
    }

    fn rule(&mut self, color: Color) -> Result<NodeId, RenderError> {
        self.fixed(
            Dimension::Percent(1.0),
            1.0,
            Paint {
                background: Some(color),
                ..Default::default()
            },
        )
    }

    fn container(
        &mut self,
        style: Style,
        children: &[NodeId],
        paint: Paint,
    ) -> Result<NodeId, RenderError> {
        let node = self
            .taffy
            .new_with_children(style, children)
            .map_err(layout_err)?;
        self.paint.insert(node, paint);
        Ok(node)
    }

    fn header(&mut self, header: &Header, width: f32) -> Result<NodeId, RenderError> {
        let theme = self.theme.clone();
        let align = match theme.header_align {
            HeaderAlign::Center => Align::Center,
            HeaderAlign::Left => Align::Left,
        };
        let inset = if theme.header_background.is_some() { 20.0 } else { 0.0 };
        let inner = width - 2.0 * inset;
        let mut children = Vec::new();

        let avatar_paint = Paint {
            content: Some(match &header.avatar {
                Avatar::Image(src) => BoxContent::Image {
                    src: src.clone(),
                    round: true,
                },
                Avatar::Placeholder => BoxContent::AvatarPlaceholder {
                    color: theme.header_text.with_alpha(0.35),
                },
            }),
            ..Default::default()
        };
        children.push(self.fixed(
            Dimension::Length(theme.avatar_size),
            theme.avatar_size,
            avatar_paint,
        )?);

        children.extend(self.text(
            &header.name,
            theme.name_size,
            FontKey::BOLD,
            theme.header_text,
            inner,
            align,
        )?);
        let position_color = if theme.header_background.is_some() {
            theme.header_text
        } else {
            theme.accent
        };
        children.extend(self.text(
            &header.position,
            theme.title_size,
            FontKey::REGULAR,
            position_color,
            inner,
            align,
        )?);

        if !header.contacts.is_empty() {
            let contact_color = if theme.header_background.is_some() {
                theme.header_text.with_alpha(0.85)
            } else {
                theme.muted
            };
            let mut items = Vec::new();
            for contact in &header.contacts {
                items.extend(self.text(
                    &contact.text,
                    theme.small_size,
                    FontKey::REGULAR,
                    contact_color,
                    inner,
                    Align::Left,
                )?);
            }
            let row = self.container(
                Style {
                    display: taffy::Display::Flex,
                    flex_direction: taffy::FlexDirection::Row,
                    flex_wrap: taffy::FlexWrap::Wrap,
                    justify_content: Some(match align {
                        Align::Center => taffy::JustifyContent::Center,
                        Align::Left => taffy::JustifyContent::Start,
                    }),
                    size: Size {
                        width: Dimension::Length(inner),
                        height: Dimension::Auto,
                    },
                    gap: Size {
                        width: LengthPercentage::Length(12.0),
                        height: LengthPercentage::Length(4.0),
                    },
                    margin: margin_top(2.0),
                    ..Default::default()
                },
                &items,
                Paint::default(),
            )?;
            children.push(row);
        }

        if theme.header_rule {
            children.push(self.rule(theme.rule)?);
        }

        let style = Style {
            size: Size {
                width: Dimension::Length(width),
                height: Dimension::Auto,
            },
            padding: uniform(inset),
            ..column_style(6.0, align)
        };
        self.container(
            style,
            &children,
            Paint {
                background: theme.header_background,
                ..Default::default()
            },
        )
    }

    fn section(&mut self, section: &Section, width: f32) -> Result<NodeId, RenderError> {
        let theme = self.theme.clone();
        let mut children = Vec::new();

        let title = if theme.uppercase_titles {
            section.title().to_uppercase()
        } else {
            section.title().to_string()
        };
        children.extend(self.text(
            &title,
            theme.title_size,
            FontKey::BOLD,
            theme.accent,
            width,
            Align::Left,
        )?);
        if theme.section_rule {
            children.push(self.rule(theme.rule)?);
        }

        match section {
            Section::Summary { text } => {
                children.extend(self.text(
                    text,
                    theme.body_size,
                    FontKey::REGULAR,
                    theme.text,
                    width,
                    Align::Left,
                )?);
            }
            Section::Experience { entries } => {
                for entry in entries {
                    let mut lines = Vec::new();
                    lines.extend(self.text(
                        &entry.position,
                        theme.body_size + 1.0,
                        FontKey::BOLD,
                        theme.text,
                        width,
                        Align::Left,
                    )?);
                    lines.extend(self.text(
                        &entry.company,
                        theme.body_size,
                        FontKey::REGULAR,
                        theme.accent,
                        width,
                        Align::Left,
                    )?);
                    lines.extend(self.text(
                        &entry.date_range,
                        theme.small_size,
                        FontKey::REGULAR,
                        theme.muted,
                        width,
                        Align::Left,
                    )?);
                    lines.extend(self.text(
                        &entry.description,
                        theme.body_size,
                        FontKey::REGULAR,
                        theme.text,
                        width,
                        Align::Left,
                    )?);
                    let style = Style {
                        margin: margin_top(4.0),
                        ..column_style(2.0, Align::Left)
                    };
                    children.push(self.container(style, &lines, Paint::default())?);
                }
            }
            Section::Education {
                institution,
                major,
                detail,
            } => {
                children.extend(self.text(
                    institution,
                    theme.body_size + 1.0,
                    FontKey::BOLD,
                    theme.text,
                    width,
                    Align::Left,
                )?);
                children.extend(self.text(
                    major,
                    theme.body_size,
                    FontKey::REGULAR,
                    theme.text,
                    width,
                    Align::Left,
                )?);
                children.extend(self.text(
                    detail,
                    theme.small_size,
                    FontKey::REGULAR,
                    theme.muted,
                    width,
                    Align::Left,
                )?);
            }
            Section::Skills { items } => match theme.skill_style {
                SkillStyle::Inline => {
                    children.extend(self.text(
                        &items.join(", "),
                        theme.body_size,
                        FontKey::REGULAR,
                        theme.text,
                        width,
                        Align::Left,
                    )?);
                }
                SkillStyle::Chips => {
                    let mut chips = Vec::new();
                    for item in items {
                        let Some(label) = self.text(
                            item,
                            theme.small_size,
                            FontKey::REGULAR,
                            theme.text,
                            width - 16.0,
                            Align::Left,
                        )?
                        else {
                            continue;
                        };
                        let chip = self.container(
                            Style {
                                display: taffy::Display::Flex,
                                padding: padding(3.0, 8.0),
                                border: uniform(1.0),
                                flex_shrink: 0.0,
                                ..Default::default()
                            },
                            &[label],
                            Paint {
                                background: Some(theme.chip_background),
                                border: Some(Border {
                                    width: 1.0,
                                    color: theme.accent.with_alpha(0.4),
                                }),
                                content: None,
                            },
                        )?;
                        chips.push(chip);
                    }
                    let row = self.container(
                        Style {
                            display: taffy::Display::Flex,
                            flex_direction: taffy::FlexDirection::Row,
                            flex_wrap: taffy::FlexWrap::Wrap,
                            size: Size {
                                width: Dimension::Length(width),
                                height: Dimension::Auto,
                            },
                            gap: Size {
                                width: LengthPercentage::Length(6.0),
                                height: LengthPercentage::Length(6.0),
                            },
                            ..Default::default()
                        },
                        &chips,
                        Paint::default(),
                    )?;
                    children.push(row);
                }
            },
        }

        let style = Style {
            size: Size {
                width: Dimension::Length(width),
                height: Dimension::Auto,
            },
            margin: margin_top(theme.section_gap),
            ..column_style(6.0, Align::Left)
        };
        self.container(style, &children, Paint::default())
    }

    fn extract(
        &mut self,
        node: NodeId,
        offset_x: f32,
        offset_y: f32,
    ) -> Result<PositionedBox, RenderError> {
        let layout = *self.taffy.layout(node).map_err(layout_err)?;
        let paint = self.paint.remove(&node).unwrap_or_default();

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let mut children = Vec::new();
        for child in self.taffy.children(node).map_err(layout_err)? {
            children.push(self.extract(child, x, y)?);
        }

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            background: paint.background,
            border: paint.border,
            content: paint.content.unwrap_or(BoxContent::None),
            children,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out `tree` in a viewport `width` px wide.
pub fn layout_tree(
    tree: &RenderTree,
    width: f32,
    fonts: &FontManager,
) -> Result<SurfaceLayout, RenderError> {
    let theme = Theme::for_choice(tree.template);
    let pad = theme.padding;
    let background = theme.background;
    let inner = (width - 2.0 * pad).max(1.0);
    let mut builder = LayoutBuilder::new(fonts, theme);

    let mut children = vec![builder.header(&tree.header, inner)?];
    for section in &tree.sections {
        children.push(builder.section(section, inner)?);
    }

    let root_style = Style {
        size: Size {
            width: Dimension::Length(width),
            height: Dimension::Auto,
        },
        padding: uniform(pad),
        ..column_style(0.0, Align::Left)
    };
    let root = builder.container(
        root_style,
        &children,
        Paint {
            background: (!background.is_transparent()).then_some(background),
            ..Default::default()
        },
    )?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_err)?;

    let root_box = builder.extract(root, 0.0, 0.0)?;
    Ok(SurfaceLayout {
        width: root_box.width,
        height: root_box.height,
        root: root_box,
    })
}

/// Lay out a captured surface.
pub fn layout_surface(
    surface: &Surface,
    fonts: &FontManager,
) -> Result<SurfaceLayout, RenderError> {
    layout_tree(&surface.tree, surface.width_px, fonts)
}
