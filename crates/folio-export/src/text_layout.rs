//! Plain text page layout.
//!
//! A degraded export path that does not use the parser, the diagram engine
//! or a composer. Lines are classified by prefix only (`#` headings, `-`/`*`
//! bullets, fenced code, everything else is body text), wrapped using an
//! average glyph width and placed with a vertical cursor that starts a new
//! page when the content area is full.

use crate::exporter::{ARTIFACT_STEM, Artifact, ExportError};
use crate::geometry::{PageConfig, PageGeometry};

/// Millimetres per typographic point.
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Heading sizes in points, by level.
const HEADING_PT: [f32; 3] = [20.0, 16.0, 13.0];

/// Page separator in the text rendition.
pub const PAGE_SEPARATOR: char = '\u{c}';

/// Font metrics used for wrapping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextFont {
    /// Body text size in points.
    pub body_pt: f32,
    /// Line advance as a multiple of the font size.
    pub line_spacing: f32,
    /// Average glyph width of proportional text, in em.
    pub glyph_width_em: f32,
    /// Glyph width of code text, in em.
    pub code_glyph_width_em: f32,
}

impl Default for TextFont {
    fn default() -> Self {
        Self {
            body_pt: 11.0,
            line_spacing: 1.4,
            glyph_width_em: 0.5,
            code_glyph_width_em: 0.6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Heading(u8),
    Bullet,
    Code,
    Body,
}

/// One placed line.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLine {
    pub kind: LineKind,
    pub text: String,
    /// Font size in points.
    pub size_pt: f32,
    /// Top of the line, measured from the top page edge.
    pub y_mm: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPage {
    pub lines: Vec<PlacedLine>,
}

/// Prefix-based text layout.
pub struct TextLayout {
    geometry: PageGeometry,
    font: TextFont,
    pages: Vec<TextPage>,
    current: TextPage,
    cursor: f32,
}

impl TextLayout {
    /// Lay out `markdown` onto pages of `geometry`.
    #[must_use]
    pub fn compose(markdown: &str, geometry: &PageGeometry, font: &TextFont) -> Vec<TextPage> {
        let mut layout = Self {
            geometry: *geometry,
            font: *font,
            pages: Vec::new(),
            current: TextPage::default(),
            cursor: 0.0,
        };

        let mut in_code = false;
        for line in markdown.lines() {
            if line.trim_start().starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code {
                layout.push(LineKind::Code, line.trim_end());
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                layout.gap(0.5);
            } else if let Some((level, text)) = heading(trimmed) {
                layout.gap(0.5);
                layout.push(LineKind::Heading(level), text);
            } else if let Some(text) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                layout.push(LineKind::Bullet, &strip_emphasis(text));
            } else {
                layout.push(LineKind::Body, &strip_emphasis(trimmed));
            }
        }

        layout.finish()
    }

    fn size_pt(&self, kind: LineKind) -> f32 {
        match kind {
            LineKind::Heading(level) => HEADING_PT[usize::from(level.clamp(1, 3)) - 1],
            LineKind::Code => self.font.body_pt - 1.0,
            LineKind::Bullet | LineKind::Body => self.font.body_pt,
        }
    }

    fn line_height_mm(&self, size_pt: f32) -> f32 {
        size_pt * MM_PER_PT * self.font.line_spacing
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn columns(&self, kind: LineKind, size_pt: f32) -> usize {
        let em = if kind == LineKind::Code {
            self.font.code_glyph_width_em
        } else {
            self.font.glyph_width_em
        };
        let glyph_mm = size_pt * MM_PER_PT * em;
        let columns = (self.geometry.content_width_mm() / glyph_mm).floor();
        if columns.is_finite() && columns >= 1.0 {
            columns as usize
        } else {
            1
        }
    }

    /// Advance the cursor by a fraction of a body line, unless at the top of
    /// a page.
    fn gap(&mut self, lines: f32) {
        if self.current.lines.is_empty() {
            return;
        }
        self.cursor += self.line_height_mm(self.font.body_pt) * lines;
    }

    fn push(&mut self, kind: LineKind, text: &str) {
        let size_pt = self.size_pt(kind);
        let height = self.line_height_mm(size_pt);
        let (first_prefix, next_prefix) = match kind {
            LineKind::Bullet => ("\u{2022} ", "  "),
            LineKind::Code => ("    ", "    "),
            LineKind::Heading(_) | LineKind::Body => ("", ""),
        };
        let width = self
            .columns(kind, size_pt)
            .saturating_sub(first_prefix.chars().count())
            .max(1);

        for (i, piece) in wrap(text, width).into_iter().enumerate() {
            if self.cursor + height > self.geometry.content_height_mm()
                && !self.current.lines.is_empty()
            {
                self.pages.push(std::mem::take(&mut self.current));
                self.cursor = 0.0;
            }
            let prefix = if i == 0 { first_prefix } else { next_prefix };
            self.current.lines.push(PlacedLine {
                kind,
                text: format!("{prefix}{piece}"),
                size_pt,
                y_mm: self.geometry.margin_mm() + self.cursor,
            });
            self.cursor += height;
        }
    }

    fn finish(mut self) -> Vec<TextPage> {
        if !self.current.lines.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Render laid-out pages as plain text, one form feed between pages.
#[must_use]
pub fn render_text(pages: &[TextPage]) -> String {
    pages
        .iter()
        .map(|page| {
            page.lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\u{c}")
}

/// Export `markdown` through the text layout.
pub fn export_text(
    markdown: &str,
    page: &PageConfig,
    font: &TextFont,
) -> Result<Artifact, ExportError> {
    if markdown.trim().is_empty() {
        return Err(ExportError::EmptyDocument);
    }
    let geometry = PageGeometry::new(page)?;
    let pages = TextLayout::compose(markdown, &geometry, font);
    tracing::info!(pages = pages.len(), geometry = %geometry, "Laid out text export");

    let mut text = render_text(&pages);
    text.push('\n');
    Ok(Artifact {
        file_name: format!("{ARTIFACT_STEM}.txt"),
        media_type: "text/plain",
        bytes: text.into_bytes(),
    })
}

fn heading(line: &str) -> Option<(u8, &str)> {
    for (level, prefix) in [(3, "### "), (2, "## "), (1, "# ")] {
        if let Some(text) = line.strip_prefix(prefix) {
            return Some((level, text.trim()));
        }
    }
    None
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace('`', "")
}

/// Greedy word wrap to `width` characters; overlong words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}
