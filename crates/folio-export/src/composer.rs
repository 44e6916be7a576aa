//! Capture-and-paginate seam.
//!
//! [`PageComposer`] turns a fully normalized snapshot into paginated bytes.
//! [`PrintHtmlComposer`] produces a print-ready standalone HTML page: `@page`
//! rules carry the format and margins, and every diagram container is marked
//! `break-inside: avoid`.

use std::fmt::Write as _;
use std::future::Future;

use folio_renderer::{BASE_CSS, Document, escape_html, render_html};

use crate::geometry::PageGeometry;

/// Failure reported by a composer.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CaptureError {
    message: String,
}

impl CaptureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Input handed to a composer.
#[derive(Clone, Debug)]
pub struct CaptureRequest {
    /// Normalized document to paginate.
    pub document: Document,
    pub geometry: PageGeometry,
    /// Element ids that must not be split across pages.
    pub avoid_break: Vec<String>,
}

/// Paginated output of a composer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedPages {
    pub bytes: Vec<u8>,
    /// File extension without the dot.
    pub extension: &'static str,
    pub media_type: &'static str,
}

/// Capture-and-paginate engine.
pub trait PageComposer: Send + Sync {
    fn compose(
        &self,
        request: CaptureRequest,
    ) -> impl Future<Output = Result<ComposedPages, CaptureError>> + Send;
}

/// Composes print-ready HTML.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintHtmlComposer;

impl PrintHtmlComposer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the print stylesheet for a request.
    #[must_use]
    pub fn print_css(request: &CaptureRequest) -> String {
        let g = &request.geometry;
        let mut css = format!(
            "@page {{ size: {} {}; margin: {}mm; }}\n\
             .markdown-body {{ max-width: {:.2}px; margin: 0 auto; }}\n\
             @media print {{ body {{ margin: 0; }} }}\n",
            g.format().as_str(),
            g.orientation().as_str(),
            g.margin_mm(),
            g.content_width_px(),
        );

        if !request.avoid_break.is_empty() {
            let selectors: Vec<String> = request
                .avoid_break
                .iter()
                .map(|id| format!("#{id}"))
                .collect();
            let _ = writeln!(
                css,
                "{} {{ break-inside: avoid; page-break-inside: avoid; }}",
                selectors.join(", ")
            );
        }
        css
    }
}

impl PageComposer for PrintHtmlComposer {
    async fn compose(&self, request: CaptureRequest) -> Result<ComposedPages, CaptureError> {
        let title = request.document.title.as_deref().unwrap_or("Document");
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{BASE_CSS}</style>\n<style>\n{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_html(title),
            Self::print_css(&request),
            render_html(&request.document)
        );
        Ok(ComposedPages {
            bytes: html.into_bytes(),
            extension: "html",
            media_type: "text/html",
        })
    }
}
