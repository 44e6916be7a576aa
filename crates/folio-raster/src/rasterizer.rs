//! SVG to PNG rasterization.

use std::sync::Arc;

use folio_renderer::{RasterVisual, VectorVisual, VisualSize};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb};

/// Largest surface edge in pixels.
pub const MAX_SURFACE_EDGE: u32 = 16_384;

/// Default quality multiplier.
pub const DEFAULT_SCALE: f32 = 2.0;

/// Size used when a visual carries no usable size information.
pub const DEFAULT_TARGET: (f32, f32) = (600.0, 400.0);

/// Rasterization failure.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG: {0}")]
    Parse(String),
    #[error("invalid surface size {width}x{height}")]
    Surface { width: f32, height: f32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

/// Rasterizer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterConfig {
    /// Quality multiplier applied to each dimension.
    pub scale: f32,
    /// Last-resort target size in CSS pixels.
    pub default_size: (f32, f32),
    /// Load system fonts so `<text>` elements render.
    pub load_system_fonts: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            default_size: DEFAULT_TARGET,
            load_system_fonts: true,
        }
    }
}

/// Result of rasterizing with fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterOutcome {
    Raster(RasterVisual),
    /// Rasterization failed; the original vector is kept.
    Vector(VectorVisual),
}

/// Paints vector visuals onto fixed-resolution surfaces.
///
/// The font database is loaded once and shared by every call.
#[derive(Clone)]
pub struct Rasterizer {
    scale: f32,
    default_size: (f32, f32),
    fontdb: Arc<fontdb::Database>,
}

impl Rasterizer {
    /// Create a rasterizer. Invalid scale or default size fall back to the
    /// built-in defaults.
    #[must_use]
    pub fn new(config: RasterConfig) -> Self {
        let mut db = fontdb::Database::new();
        if config.load_system_fonts {
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "Loaded system fonts");
        }

        let scale = if config.scale.is_finite() && config.scale > 0.0 {
            config.scale
        } else {
            DEFAULT_SCALE
        };
        let default_size = valid_size(config.default_size).unwrap_or(DEFAULT_TARGET);

        Self {
            scale,
            default_size,
            fontdb: Arc::new(db),
        }
    }

    /// Quality multiplier in use.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pick the target size of a visual in CSS pixels.
    ///
    /// Prefers the coordinate space, then declared `width`/`height`, then the
    /// laid-out display size, then the configured default. Never returns a
    /// zero or non-finite dimension.
    #[must_use]
    pub fn target_size(&self, visual: &VectorVisual) -> (f32, f32) {
        let measured = match visual.size {
            VisualSize::Absolute { width, height } => Some((width, height)),
            VisualSize::Relative { .. } => None,
        };

        visual
            .view_box
            .map(|vb| (vb.width, vb.height))
            .and_then(valid_size)
            .or_else(|| visual.declared.and_then(valid_size))
            .or_else(|| measured.and_then(valid_size))
            .unwrap_or(self.default_size)
    }

    /// Rasterize a visual at the given target size.
    ///
    /// The surface is `target * scale` pixels, painted white first, and the
    /// vector is stretched to fill it exactly. The raster keeps the visual's
    /// laid-out display size when it has one.
    ///
    /// The scale is lowered when the visual is displayed smaller than its
    /// target, so the surface never holds more than `display * scale`
    /// pixels, and again when an edge would exceed [`MAX_SURFACE_EDGE`].
    pub fn rasterize(
        &self,
        visual: &VectorVisual,
        target_width: f32,
        target_height: f32,
    ) -> Result<RasterVisual, RasterError> {
        let scale = self.surface_scale(visual, target_width, target_height);
        let (pixel_width, pixel_height) =
            surface_size(target_width * scale, target_height * scale)?;

        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&visual.markup, &options)
            .map_err(|e| RasterError::Parse(e.to_string()))?;

        let size = tree.size();
        if !(size.width() > 0.0 && size.height() > 0.0) {
            return Err(RasterError::Surface {
                width: size.width(),
                height: size.height(),
            });
        }

        let mut pixmap =
            Pixmap::new(pixel_width, pixel_height).ok_or(RasterError::Surface {
                width: target_width,
                height: target_height,
            })?;
        pixmap.fill(Color::WHITE);

        #[allow(clippy::cast_precision_loss)]
        let transform = Transform::from_scale(
            pixel_width as f32 / size.width(),
            pixel_height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let png = pixmap
            .encode_png()
            .map_err(|e| RasterError::Encode(e.to_string()))?;

        let (display_width, display_height) = match visual.size {
            VisualSize::Absolute { width, height } => {
                valid_size((width, height)).unwrap_or((target_width, target_height))
            }
            VisualSize::Relative { .. } => (target_width, target_height),
        };

        Ok(RasterVisual {
            png,
            pixel_width,
            pixel_height,
            display_width,
            display_height,
        })
    }

    /// Effective scale for a surface of `target_width` by `target_height`.
    fn surface_scale(&self, visual: &VectorVisual, target_width: f32, target_height: f32) -> f32 {
        let mut scale = self.scale;
        if let VisualSize::Absolute { width, height } = visual.size
            && let Some((width, height)) = valid_size((width, height))
        {
            let shown = (width / target_width).max(height / target_height);
            if shown < 1.0 {
                scale *= shown;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let max = (MAX_SURFACE_EDGE - 1) as f32;
        let largest = target_width.max(target_height) * scale;
        if largest > max {
            scale *= max / largest;
        }
        scale
    }

    /// Rasterize at the visual's target size, keeping the vector on failure.
    #[must_use]
    pub fn rasterize_or_keep(&self, visual: VectorVisual) -> RasterOutcome {
        let (width, height) = self.target_size(&visual);
        match self.rasterize(&visual, width, height) {
            Ok(raster) => RasterOutcome::Raster(raster),
            Err(e) => {
                tracing::warn!(error = %e, "Rasterization failed, keeping vector");
                RasterOutcome::Vector(visual)
            }
        }
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(RasterConfig::default())
    }
}

fn valid_size((width, height): (f32, f32)) -> Option<(f32, f32)> {
    (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
        .then_some((width, height))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn surface_size(width: f32, height: f32) -> Result<(u32, u32), RasterError> {
    let (w, h) = (width.ceil(), height.ceil());
    #[allow(clippy::cast_precision_loss)]
    let max = MAX_SURFACE_EDGE as f32;
    if !w.is_finite() || !h.is_finite() || w < 1.0 || h < 1.0 || w > max || h > max {
        return Err(RasterError::Surface { width, height });
    }
    Ok((w as u32, h as u32))
}
