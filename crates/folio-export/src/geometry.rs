//! Physical page geometry.
//!
//! All lengths are millimetres; CSS pixels are derived at 96 px per inch.

use std::fmt;

/// CSS pixels per millimetre (96 px per 25.4 mm).
pub const PX_PER_MM: f32 = 96.0 / 25.4;

/// Named page format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageFormat {
    /// Parse a format name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "letter",
            Self::Legal => "legal",
        }
    }

    /// Portrait width and height in millimetres.
    #[must_use]
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Page settings chosen by the user.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageConfig {
    pub format: PageFormat,
    pub orientation: Orientation,
    /// Margin on every edge, in millimetres.
    pub margin_mm: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margin_mm: 15.0,
        }
    }
}

/// Page geometry rejection.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("margin must be a finite, non-negative length, got {0}")]
    InvalidMargin(f32),
    #[error("margin {margin}mm leaves no content area (must be below {limit}mm)")]
    MarginTooLarge { margin: f32, limit: f32 },
}

/// Page and content area dimensions.
///
/// Constructed only through [`PageGeometry::new`], which guarantees a
/// positive content area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    format: PageFormat,
    orientation: Orientation,
    page_width: f32,
    page_height: f32,
    margin: f32,
}

impl PageGeometry {
    /// Compute geometry for a page configuration.
    ///
    /// # Errors
    ///
    /// Fails when the margin is negative or non-finite, or when it is at
    /// least half of the smaller page dimension.
    pub fn new(config: &PageConfig) -> Result<Self, GeometryError> {
        let margin = config.margin_mm;
        if !margin.is_finite() || margin < 0.0 {
            return Err(GeometryError::InvalidMargin(margin));
        }

        let (width, height) = config.format.dimensions_mm();
        let (page_width, page_height) = match config.orientation {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        };

        let limit = page_width.min(page_height) / 2.0;
        if margin >= limit {
            return Err(GeometryError::MarginTooLarge { margin, limit });
        }

        Ok(Self {
            format: config.format,
            orientation: config.orientation,
            page_width,
            page_height,
            margin,
        })
    }

    #[must_use]
    pub fn format(&self) -> PageFormat {
        self.format
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn page_width_mm(&self) -> f32 {
        self.page_width
    }

    #[must_use]
    pub fn page_height_mm(&self) -> f32 {
        self.page_height
    }

    #[must_use]
    pub fn margin_mm(&self) -> f32 {
        self.margin
    }

    #[must_use]
    pub fn content_width_mm(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    #[must_use]
    pub fn content_height_mm(&self) -> f32 {
        self.page_height - 2.0 * self.margin
    }

    /// Content width in CSS pixels.
    #[must_use]
    pub fn content_width_px(&self) -> f32 {
        mm_to_px(self.content_width_mm())
    }

    /// Content height in CSS pixels.
    #[must_use]
    pub fn content_height_px(&self) -> f32 {
        mm_to_px(self.content_height_mm())
    }
}

impl fmt::Display for PageGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}x{}mm, margin {}mm)",
            self.format.as_str(),
            self.orientation.as_str(),
            self.page_width,
            self.page_height,
            self.margin
        )
    }
}

#[must_use]
pub fn mm_to_px(mm: f32) -> f32 {
    mm * PX_PER_MM
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(format: PageFormat, orientation: Orientation, margin_mm: f32) -> PageConfig {
        PageConfig {
            format,
            orientation,
            margin_mm,
        }
    }

    #[test]
    fn test_a4_default() {
        let g = PageGeometry::new(&PageConfig::default()).unwrap();
        assert_eq!(g.content_width_mm(), 180.0);
        assert_eq!(g.content_height_mm(), 267.0);
        assert!((g.content_width_px() - 680.315).abs() < 0.01);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let g = PageGeometry::new(&config(PageFormat::Letter, Orientation::Landscape, 10.0))
            .unwrap();
        assert_eq!(g.page_width_mm(), 279.4);
        assert_eq!(g.page_height_mm(), 215.9);
    }

    #[test]
    fn test_margin_below_half_gives_positive_content() {
        for format in [PageFormat::A4, PageFormat::Letter, PageFormat::Legal] {
            for orientation in [Orientation::Portrait, Orientation::Landscape] {
                let limit = format.dimensions_mm().0.min(format.dimensions_mm().1) / 2.0;
                for margin in [0.0, 1.0, 15.0, 50.0, limit - 0.01] {
                    let g = PageGeometry::new(&config(format, orientation, margin)).unwrap();
                    assert!(g.content_width_mm() > 0.0, "{g}");
                    assert!(g.content_height_mm() > 0.0, "{g}");
                }
            }
        }
    }

    #[test]
    fn test_margin_at_or_above_half_fails() {
        assert_eq!(
            PageGeometry::new(&config(PageFormat::A4, Orientation::Portrait, 105.0)),
            Err(GeometryError::MarginTooLarge {
                margin: 105.0,
                limit: 105.0,
            })
        );
        assert!(PageGeometry::new(&config(PageFormat::A4, Orientation::Landscape, 200.0)).is_err());
    }

    #[test]
    fn test_invalid_margin_fails() {
        assert!(matches!(
            PageGeometry::new(&config(PageFormat::A4, Orientation::Portrait, -1.0)),
            Err(GeometryError::InvalidMargin(_))
        ));
        assert!(matches!(
            PageGeometry::new(&config(PageFormat::A4, Orientation::Portrait, f32::NAN)),
            Err(GeometryError::InvalidMargin(_))
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(PageFormat::parse("Letter"), Some(PageFormat::Letter));
        assert_eq!(PageFormat::parse("A5"), None);
        assert_eq!(Orientation::parse("LANDSCAPE"), Some(Orientation::Landscape));
    }
}
