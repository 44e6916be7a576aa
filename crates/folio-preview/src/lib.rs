//! Live preview for folio.
//!
//! Keeps a preview surface in sync with the author's text:
//! - [`RenderPipeline`] runs one render pass: parse, show pending diagram
//!   containers, resolve them concurrently, apply styling
//! - [`RenderScheduler`] debounces edits and drops superseded passes
//! - [`PreviewSurface`] holds what is shown and refuses stale writes
//! - [`DraftStore`] persists the raw text between sessions
//!
//! # Example
//!
//! ```no_run
//! use folio_diagrams::{DiagramResolver, KrokiRenderer};
//! use folio_preview::{RenderPipeline, SourceDocument};
//!
//! # async fn run() {
//! let pipeline = RenderPipeline::new(DiagramResolver::new(KrokiRenderer::default()));
//! pipeline.render(&SourceDocument::new("# Hello", 1)).await;
//! let html = pipeline.snapshot().to_html();
//! # }
//! ```

mod draft;
mod pipeline;
mod scheduler;
mod source;
mod surface;

pub use draft::{DRAFT_SLOT, DraftError, DraftStore, SAMPLE_MARKDOWN};
pub use pipeline::{PARSE_ERROR_PREFIX, RenderOutcome, RenderPipeline};
pub use scheduler::{DEFAULT_DEBOUNCE, RenderEvent, RenderScheduler};
pub use source::SourceDocument;
pub use surface::{PLACEHOLDER_TEXT, PreviewState, PreviewSurface, SharedSurface, with_surface};
