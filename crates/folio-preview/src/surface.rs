//! Live preview surface.
//!
//! The surface holds what the author currently sees. Every write is tagged
//! with the revision of the render pass that produced it, and writes from a
//! pass older than the current one are refused. This is the only place stale
//! diagram results are filtered out.

use std::sync::{Arc, Mutex, PoisonError};

use folio_renderer::{
    DiagramDescriptor, Document, StyleSettings, apply_style, render_message_page, render_page,
};

/// Text shown while there is nothing to preview.
pub const PLACEHOLDER_TEXT: &str = "Preview will appear here...";

/// What the preview currently shows.
#[derive(Clone, Debug, PartialEq)]
pub enum PreviewState {
    /// Nothing to preview (empty source).
    Placeholder,
    /// A pass is in flight; some diagrams may still be pending.
    Rendering(Document),
    /// A completed pass: every diagram is resolved or failed.
    Ready(Document),
    /// The source could not be parsed; the message replaces the preview.
    Failed(String),
}

impl PreviewState {
    /// The document being shown, if any.
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Rendering(doc) | Self::Ready(doc) => Some(doc),
            Self::Placeholder | Self::Failed(_) => None,
        }
    }

    /// Project the state to a standalone HTML page.
    #[must_use]
    pub fn to_html(&self) -> String {
        match self {
            Self::Placeholder => render_message_page("preview-placeholder", PLACEHOLDER_TEXT),
            Self::Rendering(doc) | Self::Ready(doc) => render_page(doc),
            Self::Failed(message) => render_message_page("preview-error", message),
        }
    }
}

/// Revision-guarded preview state.
#[derive(Debug)]
pub struct PreviewSurface {
    revision: u64,
    state: PreviewState,
}

impl Default for PreviewSurface {
    fn default() -> Self {
        Self {
            revision: 0,
            state: PreviewState::Placeholder,
        }
    }
}

impl PreviewSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new surface for sharing between tasks.
    #[must_use]
    pub fn shared() -> SharedSurface {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Revision of the pass that last wrote to the surface.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    fn claim(&mut self, revision: u64) -> bool {
        if revision < self.revision {
            return false;
        }
        self.revision = revision;
        true
    }

    /// Show the placeholder for `revision`.
    pub fn show_placeholder(&mut self, revision: u64) -> bool {
        if !self.claim(revision) {
            return false;
        }
        self.state = PreviewState::Placeholder;
        true
    }

    /// Start showing a freshly parsed document with pending diagrams.
    ///
    /// Containers are in source order from this point on; later writes only
    /// fill them in.
    pub fn begin(&mut self, revision: u64, document: Document) -> bool {
        if !self.claim(revision) {
            return false;
        }
        self.state = PreviewState::Rendering(document);
        true
    }

    /// Write one settled diagram into its container.
    ///
    /// Refused unless `revision` is the pass currently rendering.
    pub fn apply(&mut self, revision: u64, settled: DiagramDescriptor) -> bool {
        if revision != self.revision {
            return false;
        }
        let PreviewState::Rendering(document) = &mut self.state else {
            return false;
        };
        match document.diagram_mut(settled.id) {
            Some(container) => {
                *container = settled;
                true
            }
            None => false,
        }
    }

    /// Finish the pass: apply styling and mark the document ready.
    pub fn complete(&mut self, revision: u64, style: &StyleSettings) -> bool {
        if revision != self.revision {
            return false;
        }
        let state = std::mem::replace(&mut self.state, PreviewState::Placeholder);
        match state {
            PreviewState::Rendering(mut document) => {
                apply_style(&mut document, style);
                self.state = PreviewState::Ready(document);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Replace the preview with a failure message.
    pub fn fail(&mut self, revision: u64, message: impl Into<String>) -> bool {
        if !self.claim(revision) {
            return false;
        }
        self.state = PreviewState::Failed(message.into());
        true
    }

    /// Re-run the styling pass on the shown document without re-parsing.
    pub fn restyle(&mut self, style: &StyleSettings) {
        if let PreviewState::Ready(document) | PreviewState::Rendering(document) = &mut self.state
        {
            apply_style(document, style);
        }
    }
}

/// Preview surface shared between the pipeline and its observers.
///
/// Locks are short and never held across an await.
pub type SharedSurface = Arc<Mutex<PreviewSurface>>;

/// Run `f` with the surface locked.
pub fn with_surface<T>(surface: &SharedSurface, f: impl FnOnce(&mut PreviewSurface) -> T) -> T {
    let mut guard = surface.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}
