//! Render pipeline.
//!
//! One render pass takes a [`SourceDocument`] to a styled document on the
//! preview surface:
//!
//! 1. Parse with `folio-renderer`, turning diagram fences into pending
//!    containers (ids from the pipeline's [`DiagramIdSequence`])
//! 2. Show the document with its containers in source order
//! 3. Dispatch every container to the resolver at once and write each result
//!    as it settles
//! 4. Apply styling and mark the document ready
//!
//! Every write is tagged with the pass revision, so results from a superseded
//! pass never reach the surface.

use std::pin::pin;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use folio_diagrams::{DiagramIdSequence, DiagramProcessor, DiagramRenderer, DiagramResolver};
use folio_renderer::{
    DiagramStatus, MarkdownRenderer, ParseError, ParserConfig, RenderResult, StyleSettings,
};
use futures::StreamExt;

use crate::source::SourceDocument;
use crate::surface::{PreviewState, PreviewSurface, SharedSurface, with_surface};

/// Prefix of the message that replaces the preview when parsing fails.
pub const PARSE_ERROR_PREFIX: &str = "Error rendering preview: ";

/// How a render pass ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Blank source; the placeholder is shown.
    Placeholder,
    /// The document is ready on the surface.
    Ready {
        /// Diagram containers in the document.
        diagrams: usize,
        /// Containers that settled as failed.
        failed: usize,
        /// Warnings from code block processing.
        warnings: Vec<String>,
    },
    /// Parsing failed; the message replaces the preview.
    Failed(String),
    /// A newer pass took over the surface before this one finished.
    Superseded,
}

/// Drives render passes onto a shared preview surface.
pub struct RenderPipeline<R> {
    parser: ParserConfig,
    style: Mutex<StyleSettings>,
    ids: DiagramIdSequence,
    resolver: DiagramResolver<R>,
    surface: SharedSurface,
}

impl<R: DiagramRenderer> RenderPipeline<R> {
    /// Create a pipeline writing to a fresh surface.
    #[must_use]
    pub fn new(resolver: DiagramResolver<R>) -> Self {
        Self {
            parser: ParserConfig::default(),
            style: Mutex::new(StyleSettings::default()),
            ids: DiagramIdSequence::new(),
            resolver,
            surface: PreviewSurface::shared(),
        }
    }

    #[must_use]
    pub fn with_parser_config(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn with_style(self, style: StyleSettings) -> Self {
        *self.style.lock().unwrap_or_else(PoisonError::into_inner) = style.clamped();
        self
    }

    /// Draw diagram ids from an existing sequence.
    #[must_use]
    pub fn with_id_sequence(mut self, ids: DiagramIdSequence) -> Self {
        self.ids = ids;
        self
    }

    /// Write to an existing surface.
    #[must_use]
    pub fn with_surface(mut self, surface: SharedSurface) -> Self {
        self.surface = surface;
        self
    }

    /// The surface this pipeline writes to.
    #[must_use]
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// Copy of what the surface currently shows.
    #[must_use]
    pub fn snapshot(&self) -> PreviewState {
        with_surface(&self.surface, |surface| surface.state().clone())
    }

    /// Current style settings.
    #[must_use]
    pub fn style(&self) -> StyleSettings {
        *self.style.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the style settings and re-run the styling pass on the shown
    /// document. Parsing and diagram resolution are not repeated.
    pub fn set_style(&self, style: StyleSettings) {
        let style = style.clamped();
        *self.style.lock().unwrap_or_else(PoisonError::into_inner) = style;
        with_surface(&self.surface, |surface| surface.restyle(&style));
    }

    /// Run one render pass for `source`.
    pub async fn render(&self, source: &SourceDocument) -> RenderOutcome {
        let revision = source.revision();
        let start = Instant::now();

        if source.is_blank() {
            return if with_surface(&self.surface, |s| s.show_placeholder(revision)) {
                RenderOutcome::Placeholder
            } else {
                RenderOutcome::Superseded
            };
        }

        let RenderResult { document, warnings } = match self.parse(source.text()) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(revision, error = %e, "Markdown parsing failed");
                let message = format!("{PARSE_ERROR_PREFIX}{e}");
                return if with_surface(&self.surface, |s| s.fail(revision, message.clone())) {
                    RenderOutcome::Failed(message)
                } else {
                    RenderOutcome::Superseded
                };
            }
        };

        let pending: Vec<_> = document.diagrams().into_iter().cloned().collect();
        let diagrams = pending.len();

        if !with_surface(&self.surface, |s| s.begin(revision, document)) {
            tracing::debug!(revision, "Render pass superseded before start");
            return RenderOutcome::Superseded;
        }

        let mut failed = 0;
        let mut stale = false;
        let mut settled = pin!(self.resolver.resolve_all(pending));
        while let Some(descriptor) = settled.next().await {
            if matches!(descriptor.status, DiagramStatus::Failed(_)) {
                failed += 1;
            }
            let id = descriptor.id;
            if !with_surface(&self.surface, |s| s.apply(revision, descriptor)) {
                // Keep draining: in-flight resolutions are allowed to finish.
                tracing::debug!(revision, id = %id, "Dropped stale diagram result");
                stale = true;
            }
        }

        let style = self.style();
        if stale || !with_surface(&self.surface, |s| s.complete(revision, &style)) {
            tracing::debug!(revision, "Render pass superseded");
            return RenderOutcome::Superseded;
        }

        tracing::info!(
            revision,
            diagrams,
            failed,
            elapsed_ms = start.elapsed().as_millis(),
            "Rendered preview"
        );
        RenderOutcome::Ready {
            diagrams,
            failed,
            warnings,
        }
    }

    fn parse(&self, text: &str) -> Result<RenderResult, ParseError> {
        MarkdownRenderer::new(self.parser.clone())
            .with_processor(DiagramProcessor::new(self.ids.clone()))
            .render(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use folio_diagrams::MockRenderer;
    use folio_renderer::{Block, DiagramId, Inline, Visual, VisualSize, plain_text};
    use pretty_assertions::assert_eq;

    fn pipeline() -> RenderPipeline<MockRenderer> {
        RenderPipeline::new(DiagramResolver::new(MockRenderer::new()))
    }

    fn ready_document(pipeline: &RenderPipeline<MockRenderer>) -> folio_renderer::Document {
        match pipeline.snapshot() {
            PreviewState::Ready(doc) => doc,
            other => panic!("expected ready preview, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_heading_and_paragraph() {
        let pipeline = pipeline();
        let outcome = pipeline
            .render(&SourceDocument::new("# Title\n\nSome text", 1))
            .await;

        assert_eq!(
            outcome,
            RenderOutcome::Ready {
                diagrams: 0,
                failed: 0,
                warnings: Vec::new(),
            }
        );
        let doc = ready_document(&pipeline);
        assert!(doc.diagrams().is_empty());
        let Block::Heading { level, content, .. } = &doc.blocks[0] else {
            panic!("expected heading, got {:?}", doc.blocks[0]);
        };
        assert_eq!(*level, 1);
        assert_eq!(plain_text(content), "Title");
        assert_eq!(
            doc.blocks[1],
            Block::Paragraph(vec![Inline::Text("Some text".to_owned())])
        );
        let html = pipeline.snapshot().to_html();
        assert!(html.contains(">Title</h1>"));
        assert!(html.contains("<p>Some text</p>"));
    }

    #[tokio::test]
    async fn test_valid_diagram_resolves_to_sized_visual() {
        let pipeline = pipeline();
        let outcome = pipeline
            .render(&SourceDocument::new(
                "```mermaid\ngraph TD\n  A --> B\n```\n",
                1,
            ))
            .await;

        assert!(matches!(outcome, RenderOutcome::Ready { diagrams: 1, failed: 0, .. }));
        let doc = ready_document(&pipeline);
        let diagrams = doc.diagrams();
        assert_eq!(diagrams.len(), 1);
        let DiagramStatus::Resolved(Visual::Vector(visual)) = &diagrams[0].status else {
            panic!("expected resolved vector, got {:?}", diagrams[0].status);
        };
        assert_eq!(
            visual.size,
            VisualSize::Absolute {
                width: 240.0,
                height: 120.0,
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_diagram_fails_locally() {
        let pipeline = pipeline();
        let outcome = pipeline
            .render(&SourceDocument::new(
                "# Intro\n\n```mermaid\ninvalid [[\n```\n\nAfter the diagram.\n",
                1,
            ))
            .await;

        assert!(matches!(outcome, RenderOutcome::Ready { diagrams: 1, failed: 1, .. }));
        let doc = ready_document(&pipeline);
        let diagrams = doc.diagrams();
        assert_eq!(diagrams.len(), 1);
        let DiagramStatus::Failed(message) = &diagrams[0].status else {
            panic!("expected failure, got {:?}", diagrams[0].status);
        };
        assert!(!message.is_empty());
        assert!(matches!(doc.blocks[0], Block::Heading { .. }));
        assert_eq!(
            doc.blocks[2],
            Block::Paragraph(vec![Inline::Text("After the diagram.".to_owned())])
        );
        assert!(
            pipeline
                .snapshot()
                .to_html()
                .contains("Diagram rendering failed: Parse error")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_containers_keep_source_order() {
        let renderer = MockRenderer::new();
        let pipeline = RenderPipeline::new(DiagramResolver::new(renderer));
        let source = "```mermaid\n%% delay=300\nA\n```\n\n\
                      ```mermaid\n%% delay=100\ninvalid\n```\n\n\
                      ```dot\ndigraph { a -> b }\n```\n";

        let outcome = pipeline.render(&SourceDocument::new(source, 1)).await;

        assert!(matches!(outcome, RenderOutcome::Ready { diagrams: 3, failed: 1, .. }));
        let doc = ready_document(&pipeline);
        let ids: Vec<_> = doc.diagrams().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiagramId::new(0), DiagramId::new(1), DiagramId::new(2)]);
        assert!(doc.all_diagrams_terminal());
        assert_eq!(doc.diagrams()[2].language, "graphviz");
    }

    #[tokio::test]
    async fn test_ids_never_reused_across_passes() {
        let pipeline = pipeline();
        let source = "```mermaid\ngraph TD\n```\n";

        pipeline.render(&SourceDocument::new(source, 1)).await;
        let first = ready_document(&pipeline).diagrams()[0].id;
        pipeline.render(&SourceDocument::new(source, 2)).await;
        let second = ready_document(&pipeline).diagrams()[0].id;

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_blank_source_shows_placeholder() {
        let pipeline = pipeline();
        pipeline.render(&SourceDocument::new("# a", 1)).await;
        let outcome = pipeline.render(&SourceDocument::new("  \n", 2)).await;

        assert_eq!(outcome, RenderOutcome::Placeholder);
        assert_eq!(pipeline.snapshot(), PreviewState::Placeholder);
    }

    #[tokio::test]
    async fn test_parse_failure_replaces_preview() {
        let pipeline = pipeline().with_parser_config(ParserConfig {
            max_source_bytes: 8,
            ..ParserConfig::default()
        });
        let outcome = pipeline
            .render(&SourceDocument::new("# A long heading", 1))
            .await;

        let RenderOutcome::Failed(message) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(message.starts_with(PARSE_ERROR_PREFIX));
        assert_eq!(pipeline.snapshot(), PreviewState::Failed(message));
    }

    #[tokio::test]
    async fn test_unknown_fence_attribute_warns() {
        let pipeline = pipeline();
        let outcome = pipeline
            .render(&SourceDocument::new("```mermaid theme=dark\nA\n```\n", 1))
            .await;

        let RenderOutcome::Ready { warnings, .. } = outcome else {
            panic!("expected ready, got {outcome:?}");
        };
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("theme"));
    }

    #[tokio::test]
    async fn test_set_style_restyles_without_reparse() {
        let pipeline = pipeline();
        pipeline.render(&SourceDocument::new("text", 1)).await;

        let style = StyleSettings {
            font_size: 100.0,
            ..StyleSettings::default()
        };
        pipeline.set_style(style);
        let once = pipeline.snapshot();
        pipeline.set_style(style);

        assert_eq!(pipeline.snapshot(), once);
        let applied = ready_document(&pipeline).style.unwrap();
        assert!((applied.font_size - 32.0).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_pass_never_writes() {
        let pipeline = Arc::new(pipeline());

        let slow = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .render(&SourceDocument::new("```mermaid\n%% delay=1000\nA\n```\n", 1))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fast = pipeline
            .render(&SourceDocument::new("```mermaid\nB\n```\n", 2))
            .await;
        assert!(matches!(fast, RenderOutcome::Ready { diagrams: 1, .. }));
        let after_fast = pipeline.snapshot();

        assert_eq!(slow.await.unwrap(), RenderOutcome::Superseded);
        assert_eq!(pipeline.snapshot(), after_fast);
        let doc = ready_document(&pipeline);
        assert_eq!(doc.diagrams()[0].id, DiagramId::new(1));
    }
}
