//! SVG normalization and sizing policies.
//!
//! The engine returns SVG without a dependable pixel size. Before a visual is
//! placed in the document its root element is normalized and given a display
//! size according to the configured [`SizingPolicy`].

use std::sync::LazyLock;

use folio_renderer::{VectorVisual, ViewBox, VisualSize};
use regex::Regex;

use crate::consts::DEFAULT_BOX;

static GOOGLE_FONTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@import\s+url\([^)]*fonts\.googleapis\.com[^)]*\)\s*;?").unwrap()
});

/// Opening tag of the root `<svg>` element.
static SVG_ROOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").unwrap());

static VIEW_BOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sviewBox\s*=\s*["']([^"']*)["']"#).unwrap());

static WIDTH_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\swidth\s*=\s*["'][^"']*["']"#).unwrap());

static HEIGHT_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sheight\s*=\s*["'][^"']*["']"#).unwrap());

static STYLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sstyle\s*=\s*["'][^"']*["']"#).unwrap());

static XMLNS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\sxmlns\s*=").unwrap());

/// Pixel length: unitless or `px`.
static PIXEL_LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([0-9]*\.?[0-9]+)\s*(?:px)?\s*$").unwrap());

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// How resolved diagrams are sized.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SizingPolicy {
    /// Force a constant pixel box, ignoring the intrinsic aspect ratio.
    FixedBox { width: f32, height: f32 },
    /// Size proportionally to the declared coordinate space.
    #[default]
    Intrinsic,
    /// Only cap the width relative to the container; layout decides the rest.
    Responsive,
}

impl SizingPolicy {
    /// Fixed box with the default 600x400 size.
    #[must_use]
    pub fn fixed_default() -> Self {
        Self::FixedBox {
            width: DEFAULT_BOX.0,
            height: DEFAULT_BOX.1,
        }
    }
}

/// Strip Google Fonts `@import` so rendering never reaches the network.
#[must_use]
pub fn strip_google_fonts_import(svg: &str) -> String {
    GOOGLE_FONTS_RE.replace_all(svg, "").into_owned()
}

/// Whether the markup contains an `<svg>` root element.
#[must_use]
pub fn has_svg_root(svg: &str) -> bool {
    SVG_ROOT_RE.is_match(svg)
}

/// Parse the root `viewBox` attribute.
#[must_use]
pub fn parse_view_box(svg: &str) -> Option<ViewBox> {
    let root = SVG_ROOT_RE.find(svg)?.as_str();
    let value = VIEW_BOX_RE.captures(root)?.get(1)?.as_str();
    let numbers: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        &[min_x, min_y, width, height] => Some(ViewBox {
            min_x,
            min_y,
            width,
            height,
        }),
        _ => None,
    }
}

/// Parse explicit pixel `width`/`height` attributes on the root.
///
/// Percentages and other units are ignored.
#[must_use]
pub fn parse_declared_size(svg: &str) -> Option<(f32, f32)> {
    let root = SVG_ROOT_RE.find(svg)?.as_str();
    let width = attr_pixels(root, &WIDTH_ATTR_RE)?;
    let height = attr_pixels(root, &HEIGHT_ATTR_RE)?;
    (width > 0.0 && height > 0.0).then_some((width, height))
}

fn attr_pixels(root: &str, attr_re: &Regex) -> Option<f32> {
    let attr = attr_re.find(root)?.as_str();
    let (_, value) = attr.split_once('=')?;
    let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
    let number: f32 = PIXEL_LENGTH_RE.captures(value)?.get(1)?.as_str().parse().ok()?;
    number.is_finite().then_some(number)
}

/// Rewrite the root `<svg>` opening tag.
fn rewrite_root(svg: &str, rewrite: impl FnOnce(&str) -> String) -> String {
    match SVG_ROOT_RE.find(svg) {
        Some(m) => {
            let mut out = String::with_capacity(svg.len() + 64);
            out.push_str(&svg[..m.start()]);
            out.push_str(&rewrite(m.as_str()));
            out.push_str(&svg[m.end()..]);
            out
        }
        None => svg.to_owned(),
    }
}

/// Insert an attribute right after `<svg`.
fn insert_attr(tag: &str, attr: &str) -> String {
    format!("<svg {attr}{}", &tag["<svg".len()..])
}

/// Clean engine output: trim, strip remote font imports, ensure the SVG
/// namespace on the root so standalone consumers accept it.
#[must_use]
pub fn normalize_svg(svg: &str) -> String {
    let svg = strip_google_fonts_import(svg.trim());
    rewrite_root(&svg, |tag| {
        if XMLNS_ATTR_RE.is_match(tag) {
            tag.to_owned()
        } else {
            insert_attr(tag, &format!(r#"xmlns="{SVG_NAMESPACE}""#))
        }
    })
}

/// Set explicit pixel `width`/`height` on the root, replacing any existing
/// size attributes and inline style.
#[must_use]
pub fn set_absolute_size(svg: &str, width: f32, height: f32) -> String {
    rewrite_root(svg, |tag| {
        let tag = WIDTH_ATTR_RE.replace_all(tag, "");
        let tag = HEIGHT_ATTR_RE.replace_all(&tag, "");
        let tag = STYLE_ATTR_RE.replace_all(&tag, "");
        insert_attr(&tag, &format!(r#"width="{width}" height="{height}""#))
    })
}

/// Drop absolute size and cap the width relative to the container.
#[must_use]
pub fn set_relative_size(svg: &str, max_width_percent: f32) -> String {
    rewrite_root(svg, |tag| {
        let tag = WIDTH_ATTR_RE.replace_all(tag, "");
        let tag = HEIGHT_ATTR_RE.replace_all(&tag, "");
        let tag = STYLE_ATTR_RE.replace_all(&tag, "");
        insert_attr(
            &tag,
            &format!(r#"style="max-width: {max_width_percent}%; height: auto""#),
        )
    })
}

/// Intrinsic size of a visual: the usable coordinate space, else the
/// declared pixel size.
#[must_use]
pub fn intrinsic_size(
    view_box: Option<ViewBox>,
    declared: Option<(f32, f32)>,
) -> Option<(f32, f32)> {
    view_box
        .filter(ViewBox::is_usable)
        .map(|vb| (vb.width, vb.height))
        .or(declared)
}

/// Build a sized vector visual from normalized SVG.
#[must_use]
pub fn size_visual(svg: &str, policy: SizingPolicy) -> VectorVisual {
    let view_box = parse_view_box(svg);
    let declared = parse_declared_size(svg);

    let (markup, size) = match policy {
        SizingPolicy::FixedBox { width, height } => (
            set_absolute_size(svg, width, height),
            VisualSize::Absolute { width, height },
        ),
        SizingPolicy::Intrinsic => {
            let (width, height) = intrinsic_size(view_box, declared).unwrap_or(DEFAULT_BOX);
            (
                set_absolute_size(svg, width, height),
                VisualSize::Absolute { width, height },
            )
        }
        SizingPolicy::Responsive => (
            set_relative_size(svg, 100.0),
            VisualSize::Relative {
                max_width_percent: 100.0,
            },
        ),
    };

    VectorVisual {
        markup,
        view_box,
        declared,
        size,
    }
}

/// Re-resolve a visual to an absolute size that fits a `max_width` by
/// `max_height` box.
///
/// The visual is scaled down uniformly, so the intrinsic aspect ratio is
/// kept when known. Visuals already inside the box keep their size.
pub fn constrain_to_box(visual: &mut VectorVisual, max_width: f32, max_height: f32) {
    let (width, height) = match visual.size {
        VisualSize::Absolute { width, height } => (width, height),
        VisualSize::Relative { max_width_percent } => {
            let (w, h) = intrinsic_size(visual.view_box, visual.declared).unwrap_or(DEFAULT_BOX);
            let cap = max_width * max_width_percent / 100.0;
            if w > cap { (cap, h * cap / w) } else { (w, h) }
        }
    };
    let factor = (max_width / width).min(max_height / height).min(1.0);
    let (width, height) = (width * factor, height * factor);

    visual.markup = set_absolute_size(&visual.markup, width, height);
    visual.size = VisualSize::Absolute { width, height };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MERMAID_SVG: &str = r#"<svg id="m" width="100%" style="max-width: 320px;" viewBox="-8 -8 320 160"><g/></svg>"#;

    #[test]
    fn test_strip_google_fonts_import() {
        let svg = r"<svg><style>@import url('https://fonts.googleapis.com/css?family=Roboto');</style></svg>";
        assert_eq!(strip_google_fonts_import(svg), "<svg><style></style></svg>");
    }

    #[test]
    fn test_normalize_adds_namespace_once() {
        let normalized = normalize_svg("  <svg viewBox=\"0 0 1 1\"></svg>\n");
        assert_eq!(
            normalized,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 1 1"></svg>"#
        );
        assert_eq!(normalize_svg(&normalized), normalized);
    }

    #[test]
    fn test_normalize_keeps_prolog() {
        let svg = "<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"></svg>";
        assert_eq!(normalize_svg(svg), svg);
    }

    #[test]
    fn test_parse_view_box() {
        let vb = parse_view_box(MERMAID_SVG).unwrap();
        assert_eq!(
            vb,
            ViewBox {
                min_x: -8.0,
                min_y: -8.0,
                width: 320.0,
                height: 160.0,
            }
        );
        assert!(parse_view_box("<svg viewBox=\"0 0 a b\"></svg>").is_none());
        assert!(parse_view_box("<svg></svg>").is_none());
    }

    #[test]
    fn test_parse_declared_size_ignores_percent() {
        assert_eq!(parse_declared_size(MERMAID_SVG), None);
        assert_eq!(
            parse_declared_size(r#"<svg width="200px" height="50"></svg>"#),
            Some((200.0, 50.0))
        );
    }

    #[test]
    fn test_declared_size_only_reads_root() {
        let svg = r#"<svg viewBox="0 0 10 10"><rect width="5" height="5"/></svg>"#;
        assert_eq!(parse_declared_size(svg), None);
    }

    #[test]
    fn test_stroke_width_is_not_width() {
        let svg = r#"<svg stroke-width="2" width="10" height="20"></svg>"#;
        assert_eq!(parse_declared_size(svg), Some((10.0, 20.0)));
        assert_eq!(
            set_absolute_size(svg, 30.0, 40.0),
            r#"<svg width="30" height="40" stroke-width="2"></svg>"#
        );
    }

    #[test]
    fn test_intrinsic_policy_uses_view_box() {
        let visual = size_visual(MERMAID_SVG, SizingPolicy::Intrinsic);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 320.0,
                height: 160.0,
            }
        );
        assert_eq!(
            visual.markup,
            r#"<svg width="320" height="160" id="m" viewBox="-8 -8 320 160"><g/></svg>"#
        );
    }

    #[test]
    fn test_intrinsic_policy_falls_back_to_default_box() {
        let visual = size_visual("<svg></svg>", SizingPolicy::Intrinsic);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 600.0,
                height: 400.0,
            }
        );
    }

    #[test]
    fn test_fixed_policy_ignores_aspect_ratio() {
        let visual = size_visual(MERMAID_SVG, SizingPolicy::fixed_default());
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 600.0,
                height: 400.0,
            }
        );
        assert!(visual.markup.starts_with(r#"<svg width="600" height="400""#));
    }

    #[test]
    fn test_responsive_policy_is_relative() {
        let visual = size_visual(MERMAID_SVG, SizingPolicy::Responsive);
        assert_eq!(
            visual.size,
            VisualSize::Relative {
                max_width_percent: 100.0,
            }
        );
        assert!(
            visual
                .markup
                .starts_with(r#"<svg style="max-width: 100%; height: auto" id="m""#)
        );
    }

    #[test]
    fn test_constrain_relative_to_box_width() {
        let mut visual = size_visual(
            r#"<svg viewBox="0 0 1000 500"></svg>"#,
            SizingPolicy::Responsive,
        );
        constrain_to_box(&mut visual, 500.0, 1000.0);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 500.0,
                height: 250.0,
            }
        );
        assert!(visual.markup.contains(r#"width="500" height="250""#));
    }

    #[test]
    fn test_constrain_keeps_narrow_visual() {
        let mut visual = size_visual(MERMAID_SVG, SizingPolicy::Intrinsic);
        constrain_to_box(&mut visual, 600.0, 800.0);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 320.0,
                height: 160.0,
            }
        );
    }

    #[test]
    fn test_constrain_tall_visual_to_box_height() {
        let mut visual = size_visual(
            r#"<svg viewBox="0 0 300 4000"></svg>"#,
            SizingPolicy::Intrinsic,
        );
        constrain_to_box(&mut visual, 680.0, 1000.0);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 75.0,
                height: 1000.0,
            }
        );
        assert!(visual.markup.contains(r#"width="75" height="1000""#));
    }

    #[test]
    fn test_constrain_wide_and_tall_uses_tighter_side() {
        let mut visual = size_visual(
            r#"<svg viewBox="0 0 2000 2000"></svg>"#,
            SizingPolicy::Intrinsic,
        );
        constrain_to_box(&mut visual, 500.0, 250.0);
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 250.0,
                height: 250.0,
            }
        );
    }
}
