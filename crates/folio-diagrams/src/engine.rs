//! Diagram rendering engine seam.
//!
//! The engine turns one diagram description into SVG markup. It is
//! asynchronous and is expected to reject malformed descriptions; such
//! rejections are ordinary results, not faults.

use std::future::Future;

use folio_renderer::DiagramId;

use crate::language::DiagramLanguage;

/// Diagram info for rendering.
#[derive(Clone, Debug)]
pub struct DiagramRequest {
    /// Unique id of the container; never reused within the process.
    pub id: DiagramId,
    pub language: DiagramLanguage,
    /// Diagram description text.
    pub source: String,
}

/// Single diagram rendering error.
#[derive(Debug, thiserror::Error)]
#[error("{id}: {kind}")]
pub struct DiagramError {
    pub id: DiagramId,
    pub kind: DiagramErrorKind,
}

impl DiagramError {
    /// Create an error for the given container.
    #[must_use]
    pub fn new(id: DiagramId, kind: DiagramErrorKind) -> Self {
        Self { id, kind }
    }
}

/// Kind of diagram rendering error.
#[derive(Debug, thiserror::Error)]
pub enum DiagramErrorKind {
    /// The engine rejected the description (syntax error and the like).
    #[error("{0}")]
    Rejected(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("unsupported diagram language '{0}'")]
    UnsupportedLanguage(String),
    #[error("engine returned no SVG content")]
    InvalidSvg,
}

/// Diagram-rendering collaborator.
///
/// Implementations must be cheap to share between concurrently running
/// resolutions.
pub trait DiagramRenderer: Send + Sync {
    /// Render a diagram description to SVG markup.
    fn render(
        &self,
        request: DiagramRequest,
    ) -> impl Future<Output = Result<String, DiagramError>> + Send;
}
