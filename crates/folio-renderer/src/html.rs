//! HTML projection of the document tree.
//!
//! The live preview and the print composer both display documents through
//! this module, so what is previewed and what is exported share one markup.

use std::fmt::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::document::{
    AlertKind, Alignment, Block, Cell, DiagramDescriptor, DiagramStatus, Document, Inline,
    RasterVisual, Visual,
};
use crate::style::ThemeVariant;
use crate::util::escape_html;

/// Prefix of the inline message shown in a failed diagram container.
pub const DIAGRAM_ERROR_PREFIX: &str = "Diagram rendering failed: ";

/// Stylesheet shared by the preview page and print output.
pub const BASE_CSS: &str = r"
.markdown-body { font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; color: #24292f; margin: 0 auto; }
.markdown-body > * + * { margin-top: var(--block-spacing, 1em); }
.markdown-body pre { background: #f6f8fa; padding: 0.75em 1em; overflow-x: auto; border-radius: 4px; }
.markdown-body table { border-collapse: collapse; }
.markdown-body th, .markdown-body td { border: 1px solid #d0d7de; padding: 0.3em 0.8em; }
.markdown-body blockquote { border-left: 4px solid #d0d7de; margin-left: 0; padding-left: 1em; color: #57606a; }
.markdown-body .alert { border-left: 4px solid #0969da; padding: 0.5em 1em; }
.markdown-body .alert-title { font-weight: 600; }
.markdown-body .diagram { display: block; margin: 1em auto; padding: 0.5em; background: #fff; border: 1px solid #e1e4e8; border-radius: 4px; text-align: center; }
.markdown-body .diagram svg, .markdown-body .diagram img { display: block; margin: 0 auto; max-width: 100%; }
.markdown-body .diagram-error pre { color: #cf222e; background: #fff5f5; text-align: left; white-space: pre-wrap; }
.markdown-body .diagram-pending { min-height: 2em; color: #57606a; }
.preview-placeholder { color: #8c959f; font-style: italic; }
.preview-error { color: #cf222e; }
";

/// Render a document to an HTML fragment rooted at `<article class="markdown-body">`.
///
/// The article carries the applied style (font size, line height, theme
/// spacing) as inline CSS. Diagram containers are `<figure>` elements whose
/// `id` is the diagram id, so downstream hints can address them.
#[must_use]
pub fn render_html(document: &Document) -> String {
    let mut out = String::new();

    let theme = document
        .style
        .map_or(ThemeVariant::Default, |style| style.theme);
    out.push_str(r#"<article class="markdown-body theme-"#);
    out.push_str(theme.as_str());
    out.push('"');
    if let Some(style) = document.style {
        let _ = write!(
            out,
            r#" style="font-size: {}px; line-height: {}; --block-spacing: {}em""#,
            style.font_size, style.line_height, style.block_spacing_em
        );
    }
    out.push('>');
    write_blocks(&document.blocks, &mut out);
    out.push_str("</article>");
    out
}

/// Render a complete standalone HTML page with the base stylesheet.
#[must_use]
pub fn render_page(document: &Document) -> String {
    let title = document.title.as_deref().unwrap_or("Preview");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{BASE_CSS}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        render_html(document)
    )
}

/// Render a standalone page showing a message instead of a document.
///
/// Used for the placeholder and for parse failures, which replace the whole
/// preview.
#[must_use]
pub fn render_message_page(class: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Preview</title>\n<style>{BASE_CSS}</style>\n</head>\n<body>\n<article class=\"markdown-body\"><p class=\"{}\">{}</p></article>\n</body>\n</html>\n",
        escape_html(class),
        escape_html(message)
    )
}

fn write_blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        write_block(block, out);
    }
}

fn write_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, id, content } => {
            let _ = write!(out, r#"<h{level} id="{}">"#, escape_html(id));
            write_inlines(content, out);
            let _ = write!(out, "</h{level}>");
        }
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(inlines, out);
            out.push_str("</p>");
        }
        Block::Plain(inlines) => write_inlines(inlines, out),
        Block::CodeBlock { language, source } => match language {
            Some(lang) => {
                let _ = write!(
                    out,
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    escape_html(lang),
                    escape_html(source)
                );
            }
            None => {
                let _ = write!(out, "<pre><code>{}</code></pre>", escape_html(source));
            }
        },
        Block::Diagram(diagram) => write_diagram(diagram, out),
        Block::List { start, items } => {
            let tag = if start.is_some() { "ol" } else { "ul" };
            match start {
                Some(n) if *n != 1 => {
                    let _ = write!(out, r#"<ol start="{n}">"#);
                }
                _ => {
                    let _ = write!(out, "<{tag}>");
                }
            }
            for item in items {
                out.push_str("<li>");
                write_blocks(item, out);
                out.push_str("</li>");
            }
            let _ = write!(out, "</{tag}>");
        }
        Block::BlockQuote { alert, blocks } => match alert {
            Some(kind) => {
                let (class, title) = alert_labels(*kind);
                let _ = write!(
                    out,
                    r#"<div class="alert alert-{class}"><div class="alert-title">{title}</div><div class="alert-content">"#
                );
                write_blocks(blocks, out);
                out.push_str("</div></div>");
            }
            None => {
                out.push_str("<blockquote>");
                write_blocks(blocks, out);
                out.push_str("</blockquote>");
            }
        },
        Block::Table {
            alignments,
            head,
            rows,
        } => write_table(alignments, head, rows, out),
        Block::DefinitionList(blocks) => {
            out.push_str("<dl>");
            write_blocks(blocks, out);
            out.push_str("</dl>");
        }
        Block::DefinitionTitle(inlines) => {
            out.push_str("<dt>");
            write_inlines(inlines, out);
            out.push_str("</dt>");
        }
        Block::DefinitionDetails(blocks) => {
            out.push_str("<dd>");
            write_blocks(blocks, out);
            out.push_str("</dd>");
        }
        Block::Html(html) => out.push_str(html),
        Block::Rule => out.push_str("<hr>"),
    }
}

fn alert_labels(kind: AlertKind) -> (&'static str, &'static str) {
    match kind {
        AlertKind::Note => ("note", "Note"),
        AlertKind::Tip => ("tip", "Tip"),
        AlertKind::Important => ("important", "Important"),
        AlertKind::Warning => ("warning", "Warning"),
        AlertKind::Caution => ("caution", "Caution"),
    }
}

fn write_table(alignments: &[Alignment], head: &[Cell], rows: &[Vec<Cell>], out: &mut String) {
    out.push_str("<table><thead><tr>");
    for (i, cell) in head.iter().enumerate() {
        write_cell("th", alignments.get(i).copied(), cell, out);
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for (i, cell) in row.iter().enumerate() {
            write_cell("td", alignments.get(i).copied(), cell, out);
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn write_cell(tag: &str, alignment: Option<Alignment>, cell: &Cell, out: &mut String) {
    let style = match alignment {
        Some(Alignment::Left) => r#" style="text-align: left""#,
        Some(Alignment::Center) => r#" style="text-align: center""#,
        Some(Alignment::Right) => r#" style="text-align: right""#,
        Some(Alignment::None) | None => "",
    };
    let _ = write!(out, "<{tag}{style}>");
    write_inlines(cell, out);
    let _ = write!(out, "</{tag}>");
}

fn write_diagram(diagram: &DiagramDescriptor, out: &mut String) {
    let id = diagram.id;
    let language = escape_html(&diagram.language);
    let _ = match &diagram.status {
        DiagramStatus::Pending => write!(
            out,
            r#"<figure class="diagram diagram-pending" id="{id}" data-language="{language}"></figure>"#
        ),
        DiagramStatus::Failed(message) => write!(
            out,
            r#"<figure class="diagram diagram-error" id="{id}" data-language="{language}"><pre>{DIAGRAM_ERROR_PREFIX}{}</pre></figure>"#,
            escape_html(message)
        ),
        DiagramStatus::Resolved(Visual::Vector(vector)) => write!(
            out,
            r#"<figure class="diagram" id="{id}" data-language="{language}">{}</figure>"#,
            vector.markup
        ),
        DiagramStatus::Resolved(Visual::Raster(raster)) => write!(
            out,
            r#"<figure class="diagram" id="{id}" data-language="{language}">"#
        )
        .and_then(|()| write_raster_img(raster, out))
        .and_then(|()| out.write_str("</figure>")),
    };
}

fn write_raster_img(raster: &RasterVisual, out: &mut String) -> fmt::Result {
    out.write_str(r#"<img src="data:image/png;base64,"#)?;
    STANDARD.encode_string(&raster.png, out);
    write!(
        out,
        r#"" width="{}" height="{}" alt="diagram">"#,
        raster.display_width.round(),
        raster.display_height.round()
    )
}

fn write_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        write_inline(inline, out);
    }
}

fn write_wrapped(tag: &str, content: &[Inline], out: &mut String) {
    let _ = write!(out, "<{tag}>");
    write_inlines(content, out);
    let _ = write!(out, "</{tag}>");
}

fn write_inline(inline: &Inline, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_html(text)),
        Inline::Code(code) => {
            let _ = write!(out, "<code>{}</code>", escape_html(code));
        }
        Inline::Emphasis(content) => write_wrapped("em", content, out),
        Inline::Strong(content) => write_wrapped("strong", content, out),
        Inline::Strikethrough(content) => write_wrapped("del", content, out),
        Inline::Superscript(content) => write_wrapped("sup", content, out),
        Inline::Subscript(content) => write_wrapped("sub", content, out),
        Inline::Link {
            href,
            title,
            content,
        } => {
            let _ = write!(out, r#"<a href="{}""#, escape_html(href));
            if !title.is_empty() {
                let _ = write!(out, r#" title="{}""#, escape_html(title));
            }
            out.push('>');
            write_inlines(content, out);
            out.push_str("</a>");
        }
        Inline::Image { src, title, alt } => {
            let _ = write!(out, r#"<img src="{}""#, escape_html(src));
            if !title.is_empty() {
                let _ = write!(out, r#" title="{}""#, escape_html(title));
            }
            let _ = write!(out, r#" alt="{}">"#, escape_html(alt));
        }
        Inline::Html(html) => out.push_str(html),
        Inline::SoftBreak => out.push('\n'),
        Inline::HardBreak => out.push_str("<br>"),
        Inline::TaskMarker(checked) => {
            let attr = if *checked { " checked" } else { "" };
            let _ = write!(out, r#"<input type="checkbox" disabled{attr}> "#);
        }
    }
}
