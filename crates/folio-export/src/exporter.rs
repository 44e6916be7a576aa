//! Layout and export pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use folio_diagrams::DiagramRenderer;
use folio_preview::{PreviewState, RenderOutcome, RenderPipeline, SourceDocument, with_surface};
use folio_raster::{RasterOutcome, Rasterizer};
use folio_renderer::Visual;

use crate::composer::{CaptureError, CaptureRequest, PageComposer};
use crate::geometry::{GeometryError, PageConfig, PageGeometry};
use crate::snapshot::ExportSnapshot;

/// Base name of every exported artifact.
pub const ARTIFACT_STEM: &str = "markdown-export";

/// Export failure. The live preview is never touched.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing to export: the document is empty")]
    EmptyDocument,
    #[error("Nothing to export: the preview failed to render ({0})")]
    PreviewFailed(String),
    #[error("Preview is still rendering")]
    NotReady,
    #[error("Preview moved past revision {0} before it could be exported")]
    Superseded(u64),
    #[error("Invalid page geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Export failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One exported file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write the artifact into `dir`, replacing any previous export.
    ///
    /// The bytes land in a temporary file first, so a failed write never
    /// leaves a partial artifact.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        let write_err = |source| ExportError::Write {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        file.write_all(&self.bytes).map_err(write_err)?;
        file.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(path)
    }
}

/// Exports rendered documents through a [`PageComposer`].
pub struct Exporter<C> {
    composer: C,
    rasterizer: Rasterizer,
}

impl<C: PageComposer> Exporter<C> {
    #[must_use]
    pub fn new(composer: C, rasterizer: Rasterizer) -> Self {
        Self {
            composer,
            rasterizer,
        }
    }

    /// Render `source` afresh, then export the result.
    ///
    /// Blank sources are rejected before the preview is touched. When a newer
    /// revision owns the preview, nothing is exported, since the preview no
    /// longer shows `source`.
    pub async fn export_source<R: DiagramRenderer>(
        &self,
        pipeline: &RenderPipeline<R>,
        source: &SourceDocument,
        page: &PageConfig,
    ) -> Result<Artifact, ExportError> {
        if source.is_blank() {
            return Err(ExportError::EmptyDocument);
        }
        let revision = source.revision();
        if pipeline.render(source).await == RenderOutcome::Superseded {
            return Err(ExportError::Superseded(revision));
        }

        let (current, state) =
            with_surface(pipeline.surface(), |s| (s.revision(), s.state().clone()));
        if current != revision {
            return Err(ExportError::Superseded(revision));
        }
        self.export(&state, page).await
    }

    /// Export what the preview currently shows.
    pub async fn export(
        &self,
        state: &PreviewState,
        page: &PageConfig,
    ) -> Result<Artifact, ExportError> {
        let start = Instant::now();

        let document = match state {
            PreviewState::Placeholder => return Err(ExportError::EmptyDocument),
            PreviewState::Failed(message) => {
                return Err(ExportError::PreviewFailed(message.clone()));
            }
            PreviewState::Rendering(_) => return Err(ExportError::NotReady),
            PreviewState::Ready(document) if document.is_empty() => {
                return Err(ExportError::EmptyDocument);
            }
            PreviewState::Ready(document) => document,
        };

        let geometry = PageGeometry::new(page)?;
        let mut snapshot = ExportSnapshot::capture(document, geometry);
        self.rasterize_all(&mut snapshot).await;

        let avoid_break = snapshot
            .avoid_break()
            .iter()
            .map(ToString::to_string)
            .collect();
        let pages = self
            .composer
            .compose(CaptureRequest {
                document: snapshot.into_document(),
                geometry,
                avoid_break,
            })
            .await?;

        tracing::info!(
            geometry = %geometry,
            bytes = pages.bytes.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Exported document"
        );
        Ok(Artifact {
            file_name: format!("{ARTIFACT_STEM}.{}", pages.extension),
            media_type: pages.media_type,
            bytes: pages.bytes,
        })
    }

    /// Rasterize vector diagrams one at a time, in document order.
    async fn rasterize_all(&self, snapshot: &mut ExportSnapshot) {
        for (id, visual) in snapshot.vector_diagrams() {
            let rasterizer = self.rasterizer.clone();
            let outcome =
                tokio::task::spawn_blocking(move || rasterizer.rasterize_or_keep(visual)).await;
            match outcome {
                Ok(RasterOutcome::Raster(raster)) => {
                    snapshot.replace_visual(id, Visual::Raster(raster));
                }
                Ok(RasterOutcome::Vector(_)) => {}
                Err(e) => tracing::warn!(id = %id, error = %e, "Rasterization task failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use folio_diagrams::{DiagramResolver, MockRenderer};
    use folio_raster::RasterConfig;
    use folio_renderer::{DiagramStatus, Document};
    use pretty_assertions::assert_eq;

    use crate::composer::ComposedPages;

    /// Records requests; fails when `fail` is set.
    #[derive(Default)]
    struct RecordingComposer {
        requests: Mutex<Vec<CaptureRequest>>,
        fail: bool,
    }

    impl PageComposer for RecordingComposer {
        async fn compose(&self, request: CaptureRequest) -> Result<ComposedPages, CaptureError> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(CaptureError::new("engine crashed"));
            }
            Ok(ComposedPages {
                bytes: b"%PDF-fake".to_vec(),
                extension: "pdf",
                media_type: "application/pdf",
            })
        }
    }

    fn exporter(composer: RecordingComposer) -> Exporter<RecordingComposer> {
        Exporter::new(
            composer,
            Rasterizer::new(RasterConfig {
                load_system_fonts: false,
                ..RasterConfig::default()
            }),
        )
    }

    fn pipeline() -> RenderPipeline<MockRenderer> {
        RenderPipeline::new(DiagramResolver::new(MockRenderer::new()))
    }

    #[tokio::test]
    async fn test_empty_source_is_rejected() {
        let pipeline = pipeline();
        pipeline
            .render(&SourceDocument::new("# Keep me", 1))
            .await;
        let before = pipeline.snapshot();

        let exporter = exporter(RecordingComposer::default());
        let result = exporter
            .export_source(&pipeline, &SourceDocument::new("", 2), &PageConfig::default())
            .await;

        assert!(matches!(result, Err(ExportError::EmptyDocument)));
        assert!(exporter.composer.requests.lock().unwrap().is_empty());
        assert_eq!(pipeline.snapshot(), before);
    }

    #[tokio::test]
    async fn test_stale_revision_is_not_exported() {
        let pipeline = pipeline();
        pipeline
            .render(&SourceDocument::new("# Newer text", 5))
            .await;
        let before = pipeline.snapshot();

        let exporter = exporter(RecordingComposer::default());
        let result = exporter
            .export_source(
                &pipeline,
                &SourceDocument::new("# Older text", 3),
                &PageConfig::default(),
            )
            .await;

        assert!(matches!(result, Err(ExportError::Superseded(3))));
        assert!(exporter.composer.requests.lock().unwrap().is_empty());
        assert_eq!(pipeline.snapshot(), before);
    }

    #[tokio::test]
    async fn test_export_source_captures_the_given_text() {
        let pipeline = pipeline();
        pipeline
            .render(&SourceDocument::new("# Earlier", 1))
            .await;

        let exporter = exporter(RecordingComposer::default());
        exporter
            .export_source(
                &pipeline,
                &SourceDocument::new("# Latest", 2),
                &PageConfig::default(),
            )
            .await
            .unwrap();

        let requests = exporter.composer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].document.title.as_deref(), Some("Latest"));
    }

    #[tokio::test]
    async fn test_placeholder_and_pending_are_rejected() {
        let exporter = exporter(RecordingComposer::default());
        let page = PageConfig::default();

        assert!(matches!(
            exporter.export(&PreviewState::Placeholder, &page).await,
            Err(ExportError::EmptyDocument)
        ));
        assert!(matches!(
            exporter
                .export(&PreviewState::Ready(Document::default()), &page)
                .await,
            Err(ExportError::EmptyDocument)
        ));
        assert!(matches!(
            exporter
                .export(&PreviewState::Rendering(Document::default()), &page)
                .await,
            Err(ExportError::NotReady)
        ));
        assert!(matches!(
            exporter
                .export(&PreviewState::Failed("bad".to_owned()), &page)
                .await,
            Err(ExportError::PreviewFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_export_rasterizes_diagrams_in_snapshot_only() {
        let pipeline = pipeline();
        let exporter = exporter(RecordingComposer::default());
        let source = SourceDocument::new(
            "# Report\n\n```mermaid\ngraph TD\n```\n\n```mermaid\ninvalid\n```\n",
            1,
        );

        let artifact = exporter
            .export_source(&pipeline, &source, &PageConfig::default())
            .await
            .unwrap();

        assert_eq!(artifact.file_name, "markdown-export.pdf");
        assert_eq!(artifact.bytes, b"%PDF-fake");

        let requests = exporter.composer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(
            request.avoid_break,
            vec!["diagram-0".to_owned(), "diagram-1".to_owned()]
        );
        let diagrams = request.document.diagrams();
        assert!(matches!(
            diagrams[0].status,
            DiagramStatus::Resolved(Visual::Raster(_))
        ));
        assert!(matches!(diagrams[1].status, DiagramStatus::Failed(_)));

        // The live preview still shows the vector form.
        let PreviewState::Ready(live) = pipeline.snapshot() else {
            panic!("expected ready preview");
        };
        assert!(matches!(
            live.diagrams()[0].status,
            DiagramStatus::Resolved(Visual::Vector(_))
        ));
    }

    #[tokio::test]
    async fn test_capture_failure_leaves_preview_untouched() {
        let pipeline = pipeline();
        pipeline
            .render(&SourceDocument::new("# Title\n\ntext", 1))
            .await;
        let before = pipeline.snapshot();

        let exporter = exporter(RecordingComposer {
            fail: true,
            ..RecordingComposer::default()
        });
        let result = exporter.export(&before, &PageConfig::default()).await;

        assert!(matches!(result, Err(ExportError::Capture(_))));
        assert_eq!(pipeline.snapshot(), before);
    }

    #[tokio::test]
    async fn test_geometry_error_is_surfaced() {
        let pipeline = pipeline();
        pipeline.render(&SourceDocument::new("text", 1)).await;

        let exporter = exporter(RecordingComposer::default());
        let page = PageConfig {
            margin_mm: 200.0,
            ..PageConfig::default()
        };
        let result = exporter.export(&pipeline.snapshot(), &page).await;

        assert!(matches!(result, Err(ExportError::Geometry(_))));
        assert!(exporter.composer.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_artifact_write_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            file_name: "markdown-export.html".to_owned(),
            media_type: "text/html",
            bytes: b"first".to_vec(),
        };
        artifact.write_to(dir.path()).unwrap();

        let second = Artifact {
            bytes: b"second".to_vec(),
            ..artifact
        };
        let path = second.write_to(dir.path()).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
