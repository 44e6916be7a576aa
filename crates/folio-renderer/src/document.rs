//! Typed document tree produced by the renderer.
//!
//! The tree is the single intermediate representation shared by the live
//! preview and the export path. Rendering surfaces (HTML, print output) are
//! projections of this tree; nothing downstream re-parses markup.

use std::fmt;

use crate::style::AppliedStyle;

/// Identifier of a diagram container.
///
/// Ids come from a process-wide monotonic sequence and are never reused, so
/// two render passes never hand the same id to the diagram engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagramId(u64);

impl DiagramId {
    /// Wrap a raw sequence value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw sequence value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diagram-{}", self.0)
    }
}

/// Coordinate-space declaration of a vector visual (`viewBox`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBox {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    /// Whether width and height are finite and strictly positive.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Height divided by width.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.height / self.width
    }
}

/// Display size assigned to a visual, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisualSize {
    /// Explicit pixel box.
    Absolute { width: f32, height: f32 },
    /// Only a maximum width relative to the surrounding container.
    Relative { max_width_percent: f32 },
}

/// A resolved vector diagram.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorVisual {
    /// SVG markup with normalized root attributes.
    pub markup: String,
    /// Declared coordinate space, if the SVG carried one.
    pub view_box: Option<ViewBox>,
    /// Explicit `width`/`height` attributes found on the root, in pixels.
    pub declared: Option<(f32, f32)>,
    /// Display size assigned by the sizing policy.
    pub size: VisualSize,
}

/// A diagram painted onto a fixed-resolution surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterVisual {
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Size the image occupies in the laid-out document (CSS pixels).
    pub display_width: f32,
    pub display_height: f32,
}

/// Visual content of a resolved diagram.
#[derive(Clone, Debug, PartialEq)]
pub enum Visual {
    Vector(VectorVisual),
    Raster(RasterVisual),
}

/// Resolution state of a diagram container.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagramStatus {
    /// Dispatched but not settled. Never visible in a completed render pass.
    Pending,
    Resolved(Visual),
    /// The engine rejected the description; the message is shown inline.
    Failed(String),
}

/// A diagram container discovered in the source.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagramDescriptor {
    pub id: DiagramId,
    /// Language tag from the code fence (e.g. `mermaid`).
    pub language: String,
    /// Raw diagram description.
    pub source: String,
    pub status: DiagramStatus,
}

impl DiagramDescriptor {
    /// Create a descriptor in the `Pending` state.
    #[must_use]
    pub fn pending(id: DiagramId, language: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            language: language.into(),
            source: source.into(),
            status: DiagramStatus::Pending,
        }
    }

    /// Whether the descriptor has settled (`Resolved` or `Failed`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, DiagramStatus::Pending)
    }
}

/// Column alignment in a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// GitHub-style alert kind for blockquotes (`> [!NOTE]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl From<pulldown_cmark::BlockQuoteKind> for AlertKind {
    fn from(kind: pulldown_cmark::BlockQuoteKind) -> Self {
        use pulldown_cmark::BlockQuoteKind;
        match kind {
            BlockQuoteKind::Note => Self::Note,
            BlockQuoteKind::Tip => Self::Tip,
            BlockQuoteKind::Important => Self::Important,
            BlockQuoteKind::Warning => Self::Warning,
            BlockQuoteKind::Caution => Self::Caution,
        }
    }
}

/// Inline content.
#[derive(Clone, Debug, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    Link {
        href: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        src: String,
        title: String,
        alt: String,
    },
    /// Raw inline HTML (only produced when raw HTML is allowed).
    Html(String),
    SoftBreak,
    HardBreak,
    TaskMarker(bool),
}

/// A table cell's inline content.
pub type Cell = Vec<Inline>;

/// Structural block of the document.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        id: String,
        content: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    /// Inline run outside a paragraph (tight list items).
    Plain(Vec<Inline>),
    CodeBlock {
        language: Option<String>,
        source: String,
    },
    Diagram(DiagramDescriptor),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    BlockQuote {
        alert: Option<AlertKind>,
        blocks: Vec<Block>,
    },
    Table {
        alignments: Vec<Alignment>,
        head: Vec<Cell>,
        rows: Vec<Vec<Cell>>,
    },
    DefinitionList(Vec<Block>),
    DefinitionTitle(Vec<Inline>),
    DefinitionDetails(Vec<Block>),
    /// Raw HTML block (only produced when raw HTML is allowed).
    Html(String),
    Rule,
}

/// Rendered document tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    /// Presentation styling from the last styling pass.
    pub style: Option<AppliedStyle>,
}

impl Document {
    /// Whether the document has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Diagram containers in document order.
    #[must_use]
    pub fn diagrams(&self) -> Vec<&DiagramDescriptor> {
        let mut out = Vec::new();
        collect_diagrams(&self.blocks, &mut out);
        out
    }

    /// Visit every diagram container mutably, in document order.
    pub fn for_each_diagram_mut(&mut self, mut f: impl FnMut(&mut DiagramDescriptor)) {
        visit_diagrams_mut(&mut self.blocks, &mut f);
    }

    /// Find a diagram container by id.
    pub fn diagram_mut(&mut self, id: DiagramId) -> Option<&mut DiagramDescriptor> {
        find_diagram_mut(&mut self.blocks, id)
    }

    /// Whether every diagram container has settled.
    #[must_use]
    pub fn all_diagrams_terminal(&self) -> bool {
        self.diagrams().iter().all(|d| d.is_terminal())
    }
}

fn child_blocks(block: &Block) -> impl Iterator<Item = &[Block]> {
    let slices: Vec<&[Block]> = match block {
        Block::List { items, .. } => items.iter().map(Vec::as_slice).collect(),
        Block::BlockQuote { blocks, .. }
        | Block::DefinitionList(blocks)
        | Block::DefinitionDetails(blocks) => vec![blocks.as_slice()],
        _ => Vec::new(),
    };
    slices.into_iter()
}

fn collect_diagrams<'a>(blocks: &'a [Block], out: &mut Vec<&'a DiagramDescriptor>) {
    for block in blocks {
        if let Block::Diagram(diagram) = block {
            out.push(diagram);
        }
        for children in child_blocks(block) {
            collect_diagrams(children, out);
        }
    }
}

fn visit_diagrams_mut(blocks: &mut [Block], f: &mut impl FnMut(&mut DiagramDescriptor)) {
    for block in blocks {
        match block {
            Block::Diagram(diagram) => f(diagram),
            Block::List { items, .. } => {
                for item in items {
                    visit_diagrams_mut(item, f);
                }
            }
            Block::BlockQuote { blocks, .. }
            | Block::DefinitionList(blocks)
            | Block::DefinitionDetails(blocks) => visit_diagrams_mut(blocks, f),
            _ => {}
        }
    }
}

fn find_diagram_mut(blocks: &mut [Block], id: DiagramId) -> Option<&mut DiagramDescriptor> {
    for block in blocks {
        let found = match block {
            Block::Diagram(diagram) if diagram.id == id => return Some(diagram),
            Block::List { items, .. } => items
                .iter_mut()
                .find_map(|item| find_diagram_mut(item, id)),
            Block::BlockQuote { blocks, .. }
            | Block::DefinitionList(blocks)
            | Block::DefinitionDetails(blocks) => find_diagram_mut(blocks, id),
            _ => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagram(id: u64) -> Block {
        Block::Diagram(DiagramDescriptor::pending(
            DiagramId::new(id),
            "mermaid",
            "graph TD",
        ))
    }

    #[test]
    fn test_diagram_id_display() {
        assert_eq!(DiagramId::new(7).to_string(), "diagram-7");
    }

    #[test]
    fn test_diagrams_in_document_order_including_nested() {
        let doc = Document {
            blocks: vec![
                diagram(3),
                Block::BlockQuote {
                    alert: None,
                    blocks: vec![diagram(4)],
                },
                Block::List {
                    start: None,
                    items: vec![vec![diagram(5)], vec![Block::Rule]],
                },
            ],
            ..Document::default()
        };

        let ids: Vec<u64> = doc.diagrams().iter().map(|d| d.id.value()).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_diagram_mut_finds_nested() {
        let mut doc = Document {
            blocks: vec![Block::BlockQuote {
                alert: None,
                blocks: vec![diagram(9)],
            }],
            ..Document::default()
        };

        let found = doc.diagram_mut(DiagramId::new(9)).unwrap();
        found.status = DiagramStatus::Failed("bad".to_owned());

        assert!(doc.all_diagrams_terminal());
        assert!(doc.diagram_mut(DiagramId::new(10)).is_none());
    }

    #[test]
    fn test_pending_is_not_terminal() {
        let descriptor = DiagramDescriptor::pending(DiagramId::new(1), "mermaid", "x");
        assert!(!descriptor.is_terminal());
    }

    #[test]
    fn test_view_box_usable() {
        let vb = ViewBox {
            min_x: 0.0,
            min_y: 0.0,
            width: 200.0,
            height: 100.0,
        };
        assert!(vb.is_usable());
        assert!((vb.aspect_ratio() - 0.5).abs() < f32::EPSILON);

        let zero = ViewBox { width: 0.0, ..vb };
        assert!(!zero.is_usable());
        let nan = ViewBox {
            height: f32::NAN,
            ..vb
        };
        assert!(!nan.is_usable());
    }
}
