//! Markdown to typed document tree with pluggable code block processors.
//!
//! This crate provides a [`MarkdownRenderer`] that parses markdown with
//! `pulldown-cmark` and builds a [`Document`]: an explicit tree of blocks and
//! inlines that later stages transform instead of mutating markup.
//!
//! # Architecture
//!
//! - [`MarkdownRenderer`] walks parser events and builds the tree.
//! - [`CodeBlockProcessor`]s claim fenced code blocks by language tag; the
//!   diagram crate uses this to turn diagram fences into
//!   [`Block::Diagram`] containers.
//! - [`apply_style`] records presentation settings on a finished tree.
//! - [`render_html`] projects a tree to HTML for preview and print output.
//!
//! # Example
//!
//! ```
//! use folio_renderer::{MarkdownRenderer, ParserConfig, render_html};
//!
//! let result = MarkdownRenderer::new(ParserConfig::default())
//!     .render("# Hello\n\n**Bold** text")
//!     .unwrap();
//! let html = render_html(&result.document);
//! assert!(html.contains("<strong>Bold</strong>"));
//! ```

mod code_block;
mod document;
mod html;
mod parser;
mod renderer;
mod style;
mod util;

pub use code_block::{CodeBlockProcessor, ProcessResult};
pub use document::{
    AlertKind, Alignment, Block, Cell, DiagramDescriptor, DiagramId, DiagramStatus, Document,
    Inline, RasterVisual, VectorVisual, ViewBox, Visual, VisualSize,
};
pub use html::{BASE_CSS, DIAGRAM_ERROR_PREFIX, render_html, render_message_page, render_page};
pub use parser::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_SOURCE_BYTES, ParseError, ParserConfig};
pub use renderer::{MarkdownRenderer, RenderResult};
pub use style::{
    AppliedStyle, FONT_SIZE_RANGE, LINE_HEIGHT_RANGE, StyleSettings, ThemeVariant, apply_style,
};
pub use util::{escape_html, plain_text, slugify};
