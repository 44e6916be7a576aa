//! Export snapshots.
//!
//! A snapshot is an owned copy of the preview document. Export-only changes
//! (size constraints, raster substitution) are made to the copy and never
//! reach the live preview.

use folio_diagrams::sizing::constrain_to_box;
use folio_renderer::{DiagramId, DiagramStatus, Document, VectorVisual, Visual};

use crate::geometry::PageGeometry;

/// Independent copy of a rendered document prepared for one export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSnapshot {
    document: Document,
    geometry: PageGeometry,
    avoid_break: Vec<DiagramId>,
}

impl ExportSnapshot {
    /// Copy `document` and fit it to the content area of `geometry`.
    ///
    /// Every resolved vector diagram gets an absolute size that fits the
    /// content area, and every diagram container is marked as unsplittable.
    #[must_use]
    pub fn capture(document: &Document, geometry: PageGeometry) -> Self {
        let mut document = document.clone();
        let max_width = geometry.content_width_px();
        let max_height = geometry.content_height_px();
        let mut avoid_break = Vec::new();

        document.for_each_diagram_mut(|diagram| {
            avoid_break.push(diagram.id);
            if let DiagramStatus::Resolved(Visual::Vector(visual)) = &mut diagram.status {
                constrain_to_box(visual, max_width, max_height);
            }
        });

        Self {
            document,
            geometry,
            avoid_break,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Diagram containers that must not be split across pages, in document
    /// order.
    #[must_use]
    pub fn avoid_break(&self) -> &[DiagramId] {
        &self.avoid_break
    }

    /// Vector diagrams still waiting for rasterization, in document order.
    #[must_use]
    pub fn vector_diagrams(&self) -> Vec<(DiagramId, VectorVisual)> {
        self.document
            .diagrams()
            .into_iter()
            .filter_map(|d| match &d.status {
                DiagramStatus::Resolved(Visual::Vector(v)) => Some((d.id, v.clone())),
                _ => None,
            })
            .collect()
    }

    /// Replace the visual of one diagram.
    pub fn replace_visual(&mut self, id: DiagramId, visual: Visual) {
        if let Some(diagram) = self.document.diagram_mut(id) {
            diagram.status = DiagramStatus::Resolved(visual);
        }
    }

    /// Consume the snapshot, returning the document.
    #[must_use]
    pub fn into_document(self) -> Document {
        self.document
    }
}
