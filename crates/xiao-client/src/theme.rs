//! Color palettes and markup-to-terminal rendering for the console.

use crossterm::style::{Attribute, Color, ContentStyle};
use regex::Regex;
use std::sync::OnceLock;

use crate::chat::format::{CLASS_BOLD, CLASS_SECTION_TITLE, CLASS_SUBSECTION, CLASS_SUBTITLE};

// ── Color palette ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub title: Color,
    pub subtitle: Color,
    pub playing: Color,
    pub error: Color,
}

pub const DARK: Palette = Palette {
    primary: Color::Rgb { r: 210, g: 210, b: 225 },
    secondary: Color::Rgb { r: 115, g: 115, b: 138 },
    accent: Color::Rgb { r: 255, g: 95, b: 95 },
    title: Color::Rgb { r: 120, g: 100, b: 200 },
    subtitle: Color::Rgb { r: 255, g: 200, b: 80 },
    playing: Color::Rgb { r: 80, g: 200, b: 120 },
    error: Color::Rgb { r: 255, g: 80, b: 80 },
};

pub const LIGHT: Palette = Palette {
    primary: Color::Rgb { r: 30, g: 30, b: 40 },
    secondary: Color::Rgb { r: 100, g: 100, b: 120 },
    accent: Color::Rgb { r: 200, g: 40, b: 40 },
    title: Color::Rgb { r: 0, g: 90, b: 190 },
    subtitle: Color::Rgb { r: 150, g: 90, b: 0 },
    playing: Color::Rgb { r: 20, g: 130, b: 60 },
    error: Color::Rgb { r: 190, g: 20, b: 20 },
};

pub fn palette(dark_mode: bool) -> Palette {
    if dark_mode {
        DARK
    } else {
        LIGHT
    }
}

// ── Predefined styles ─────────────────────────────────────────────────────────

fn fg(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        ..ContentStyle::new()
    }
}

fn bold(mut style: ContentStyle) -> ContentStyle {
    style.attributes.set(Attribute::Bold);
    style
}

pub fn paint(palette: &Palette, role: Paint, text: &str) -> String {
    let style = match role {
        Paint::Primary => fg(palette.primary),
        Paint::Secondary => fg(palette.secondary),
        Paint::Accent => bold(fg(palette.accent)),
        Paint::Playing => fg(palette.playing),
        Paint::Error => fg(palette.error),
    };
    style.apply(text).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Primary,
    Secondary,
    Accent,
    Playing,
    Error,
}

// ── Markup ────────────────────────────────────────────────────────────────────

fn tag_re() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r#"<(/?)(p|span)(?:\s+class="([^"]*)")?>"#).expect("static regex")
    })
}

fn class_style(palette: &Palette, class: Option<&str>) -> ContentStyle {
    match class {
        Some(c) if c == CLASS_SECTION_TITLE => bold(fg(palette.title)),
        Some(c) if c == CLASS_SUBSECTION => fg(palette.title),
        Some(c) if c == CLASS_SUBTITLE => fg(palette.subtitle),
        Some(c) if c == CLASS_BOLD => bold(ContentStyle::new()),
        _ => ContentStyle::new(),
    }
}

/// Merge `inner` over `outer`: inner colors win, attributes add up.
fn merge(outer: ContentStyle, inner: ContentStyle) -> ContentStyle {
    let mut style = outer;
    if inner.foreground_color.is_some() {
        style.foreground_color = inner.foreground_color;
    }
    style.attributes.extend(inner.attributes);
    style
}

/// Turn formatter markup into styled terminal lines, one per paragraph.
/// Text outside known tags passes through with the base color.
pub fn render_markup(palette: &Palette, markup: &str) -> String {
    let base = fg(palette.primary);
    let mut stack = vec![base];
    let mut out = String::new();
    let mut last = 0;

    for caps in tag_re().captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        let text = &markup[last..whole.start()];
        if !text.is_empty() {
            let style = stack.last().copied().unwrap_or(base);
            out.push_str(&style.apply(text).to_string());
        }
        last = whole.end();

        let closing = !caps[1].is_empty();
        if closing {
            if stack.len() > 1 {
                stack.pop();
            }
            if &caps[2] == "p" {
                out.push('\n');
            }
        } else {
            let top = stack.last().copied().unwrap_or(base);
            let class = caps.get(3).map(|m| m.as_str());
            stack.push(merge(top, class_style(palette, class)));
        }
    }

    let tail = &markup[last..];
    if !tail.is_empty() {
        out.push_str(&base.apply(tail).to_string());
    }
    out
}
