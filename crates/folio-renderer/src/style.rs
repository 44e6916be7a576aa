//! Presentation styling pass.
//!
//! Styling is applied to an already-built [`Document`] and never feeds back
//! into parsing or diagram resolution. Applying the same settings twice leaves
//! the document unchanged.

use std::ops::RangeInclusive;

use crate::document::Document;

/// Allowed font size range in CSS pixels.
pub const FONT_SIZE_RANGE: RangeInclusive<f32> = 8.0..=32.0;

/// Allowed unitless line height range.
pub const LINE_HEIGHT_RANGE: RangeInclusive<f32> = 1.0..=3.0;

/// Theme variant selectable by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeVariant {
    #[default]
    Default,
    Compact,
    Spacious,
}

impl ThemeVariant {
    /// Parse a theme name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "compact" => Some(Self::Compact),
            "spacious" => Some(Self::Spacious),
            _ => None,
        }
    }

    /// CSS class name for the variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Compact => "compact",
            Self::Spacious => "spacious",
        }
    }

    /// Vertical spacing between blocks, in `em`.
    fn block_spacing_em(self) -> f32 {
        match self {
            Self::Default => 1.0,
            Self::Compact => 0.6,
            Self::Spacious => 1.5,
        }
    }
}

/// User-facing style controls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleSettings {
    /// Base font size in CSS pixels.
    pub font_size: f32,
    /// Unitless line height multiplier.
    pub line_height: f32,
    pub theme: ThemeVariant,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            line_height: 1.6,
            theme: ThemeVariant::Default,
        }
    }
}

impl StyleSettings {
    /// Clamp numeric controls into their allowed ranges.
    ///
    /// Non-finite values fall back to the defaults.
    #[must_use]
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            font_size: clamp_or(self.font_size, &FONT_SIZE_RANGE, defaults.font_size),
            line_height: clamp_or(self.line_height, &LINE_HEIGHT_RANGE, defaults.line_height),
            theme: self.theme,
        }
    }
}

fn clamp_or(value: f32, range: &RangeInclusive<f32>, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(*range.start(), *range.end())
    } else {
        fallback
    }
}

/// Styling recorded on a document by [`apply_style`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedStyle {
    pub font_size: f32,
    pub line_height: f32,
    pub theme: ThemeVariant,
    pub block_spacing_em: f32,
}

/// Apply presentation styling to a document.
///
/// Replaces any previously applied style, so repeated calls with the same
/// settings produce an identical document.
pub fn apply_style(document: &mut Document, settings: &StyleSettings) {
    let settings = settings.clamped();
    document.style = Some(AppliedStyle {
        font_size: settings.font_size,
        line_height: settings.line_height,
        theme: settings.theme,
        block_spacing_em: settings.theme.block_spacing_em(),
    });
}
