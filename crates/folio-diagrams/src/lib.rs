//! Diagram discovery, rendering and sizing.
//!
//! This crate turns diagram fences into sized vector visuals:
//! - [`DiagramProcessor`] implements `CodeBlockProcessor` and replaces diagram
//!   fences with pending containers, drawing ids from a [`DiagramIdSequence`]
//! - [`DiagramRenderer`] is the rendering engine seam; [`KrokiRenderer`]
//!   renders through a Kroki server (Mermaid, `PlantUML`, `GraphViz`, ...)
//! - [`DiagramResolver`] settles containers concurrently and sizes the
//!   results according to a [`SizingPolicy`]
//! - `MockRenderer` for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```no_run
//! use folio_diagrams::{DiagramIdSequence, DiagramProcessor, DiagramResolver, KrokiRenderer};
//! use folio_renderer::{MarkdownRenderer, ParserConfig};
//! use futures::StreamExt;
//!
//! # async fn run() {
//! let result = MarkdownRenderer::new(ParserConfig::default())
//!     .with_processor(DiagramProcessor::new(DiagramIdSequence::new()))
//!     .render("```mermaid\ngraph TD\n  A --> B\n```")
//!     .unwrap();
//!
//! let resolver = DiagramResolver::new(KrokiRenderer::default());
//! let pending = result.document.diagrams().into_iter().cloned().collect();
//! let settled: Vec<_> = resolver.resolve_all(pending).collect().await;
//! # }
//! ```

mod consts;
mod engine;
mod kroki;
mod language;
#[cfg(feature = "mock")]
mod mock;
mod processor;
mod resolver;
mod sequence;
pub mod sizing;

pub use consts::{DEFAULT_BOX, DEFAULT_KROKI_URL, DEFAULT_TIMEOUT};
pub use engine::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};
pub use kroki::{KrokiRenderer, create_agent};
pub use language::DiagramLanguage;
#[cfg(feature = "mock")]
pub use mock::MockRenderer;
pub use processor::DiagramProcessor;
pub use resolver::DiagramResolver;
pub use sequence::DiagramIdSequence;
pub use sizing::SizingPolicy;
