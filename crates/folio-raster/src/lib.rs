//! Vector diagram rasterization for export.
//!
//! Capture engines often reproduce embedded SVG poorly, so exported documents
//! carry diagrams as PNG instead. [`Rasterizer`] paints a sized vector visual
//! onto an opaque white surface with `resvg` and encodes it as PNG. When that
//! fails, [`Rasterizer::rasterize_or_keep`] keeps the vector form so the
//! diagram is never lost.

mod rasterizer;

pub use rasterizer::{
    DEFAULT_SCALE, DEFAULT_TARGET, MAX_SURFACE_EDGE, RasterConfig, RasterError, RasterOutcome,
    Rasterizer,
};
