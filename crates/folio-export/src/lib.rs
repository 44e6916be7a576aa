//! Paginated export for folio.
//!
//! [`Exporter`] turns a ready preview into one artifact:
//!
//! 1. Refuse empty, placeholder, failed or still-rendering previews
//! 2. Compute [`PageGeometry`] from the page settings
//! 3. Take an [`ExportSnapshot`]: a copy fitted to the content width with
//!    every diagram marked as unsplittable
//! 4. Rasterize diagrams one after another
//! 5. Hand the snapshot to a [`PageComposer`]
//!
//! [`TextLayout`] is a separate plain text path that only recognises line
//! prefixes.

mod composer;
mod exporter;
mod geometry;
mod snapshot;
mod text_layout;

pub use composer::{CaptureError, CaptureRequest, ComposedPages, PageComposer, PrintHtmlComposer};
pub use exporter::{ARTIFACT_STEM, Artifact, ExportError, Exporter};
pub use geometry::{
    GeometryError, Orientation, PX_PER_MM, PageConfig, PageFormat, PageGeometry, mm_to_px,
};
pub use snapshot::ExportSnapshot;
pub use text_layout::{
    LineKind, PAGE_SEPARATOR, PlacedLine, TextFont, TextLayout, TextPage, export_text,
    render_text,
};
