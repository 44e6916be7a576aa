//! Markdown to document tree renderer.
//!
//! Walks `pulldown-cmark` events and builds a [`Document`]. Fenced code blocks
//! are offered to registered [`CodeBlockProcessor`]s first, which is how
//! diagram containers are discovered without the renderer knowing about
//! diagram languages.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::code_block::{CodeBlockProcessor, ProcessResult, parse_fence_info};
use crate::document::{AlertKind, Alignment, Block, Cell, Document, Inline};
use crate::parser::{ParseError, ParserConfig};
use crate::util::{HeadingIds, autolink, heading_level_to_num, plain_text};

/// Result of rendering markdown.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Document tree.
    pub document: Document,
    /// Warnings generated by code block processors.
    pub warnings: Vec<String>,
}

/// Markdown renderer producing a typed document tree.
///
/// # Code Block Processors
///
/// Custom code block processing can be added via [`with_processor`](Self::with_processor).
/// Processors are checked in order; the first returning a non-`PassThrough` result wins.
///
/// # Example
///
/// ```
/// use folio_renderer::{Block, MarkdownRenderer, ParserConfig};
///
/// let result = MarkdownRenderer::new(ParserConfig::default())
///     .render("# Hello\n\n**Bold** text")
///     .unwrap();
/// assert_eq!(result.document.title.as_deref(), Some("Hello"));
/// assert!(matches!(result.document.blocks[1], Block::Paragraph(_)));
/// ```
pub struct MarkdownRenderer {
    config: ParserConfig,
    processors: Vec<Box<dyn CodeBlockProcessor>>,
}

impl MarkdownRenderer {
    /// Create a renderer with the given parser configuration.
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            processors: Vec::new(),
        }
    }

    /// Add a code block processor.
    #[must_use]
    pub fn with_processor<P: CodeBlockProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Render markdown text into a document tree.
    pub fn render(&mut self, markdown: &str) -> Result<RenderResult, ParseError> {
        if markdown.len() > self.config.max_source_bytes {
            return Err(ParseError::SourceTooLarge {
                size: markdown.len(),
                limit: self.config.max_source_bytes,
            });
        }

        let parser = Parser::new_ext(markdown, self.config.options());
        let mut builder = TreeBuilder::new(&self.config, &mut self.processors);
        for event in parser {
            builder.process_event(event)?;
        }
        let document = builder.finish();

        Ok(RenderResult {
            document,
            warnings: self
                .processors
                .iter()
                .flat_map(|p| p.warnings())
                .cloned()
                .collect(),
        })
    }
}

#[derive(Debug)]
enum ContainerKind {
    Root,
    BlockQuote(Option<AlertKind>),
    Item,
    DefinitionList,
    DefinitionDetails,
}

#[derive(Debug)]
enum InlineKind {
    Paragraph,
    Heading(u8),
    Cell,
    DefinitionTitle,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link { href: String, title: String },
    Image { src: String, title: String },
}

#[derive(Debug)]
enum Frame {
    Container {
        kind: ContainerKind,
        blocks: Vec<Block>,
        /// Inline content outside a paragraph (tight list items).
        loose: Vec<Inline>,
    },
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Table {
        alignments: Vec<Alignment>,
        head: Vec<Cell>,
        rows: Vec<Vec<Cell>>,
        row: Vec<Cell>,
    },
    Inlines {
        kind: InlineKind,
        inlines: Vec<Inline>,
    },
    Code {
        info: Option<String>,
        text: String,
    },
    Html(String),
    /// Footnote definitions and metadata blocks are dropped.
    Ignored,
}

struct TreeBuilder<'a> {
    config: &'a ParserConfig,
    processors: &'a mut [Box<dyn CodeBlockProcessor>],
    stack: Vec<Frame>,
    heading_ids: HeadingIds,
    title: Option<String>,
    code_block_index: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(config: &'a ParserConfig, processors: &'a mut [Box<dyn CodeBlockProcessor>]) -> Self {
        Self {
            config,
            processors,
            stack: vec![Frame::Container {
                kind: ContainerKind::Root,
                blocks: Vec::new(),
                loose: Vec::new(),
            }],
            heading_ids: HeadingIds::default(),
            title: None,
            code_block_index: 0,
        }
    }

    fn finish(mut self) -> Document {
        let blocks = match self.stack.drain(..1).next() {
            Some(Frame::Container {
                mut blocks, loose, ..
            }) => {
                if !loose.is_empty() {
                    blocks.push(Block::Plain(loose));
                }
                blocks
            }
            _ => Vec::new(),
        };
        Document {
            blocks,
            title: self.title,
            style: None,
        }
    }

    fn process_event(&mut self, event: Event<'_>) -> Result<(), ParseError> {
        match event {
            Event::Start(tag) => self.start_tag(tag)?,
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => {
                let inline = if self.config.newlines_to_breaks {
                    Inline::HardBreak
                } else {
                    Inline::SoftBreak
                };
                self.push_inline(inline);
            }
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => self.attach_block(Block::Rule),
            Event::TaskListMarker(checked) => self.push_inline(Inline::TaskMarker(checked)),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
        Ok(())
    }

    fn push_frame(&mut self, frame: Frame) -> Result<(), ParseError> {
        if self.stack.len() >= self.config.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.config.max_depth,
            });
        }
        self.stack.push(frame);
        Ok(())
    }

    fn push_inlines(&mut self, kind: InlineKind) -> Result<(), ParseError> {
        self.push_frame(Frame::Inlines {
            kind,
            inlines: Vec::new(),
        })
    }

    fn push_container(&mut self, kind: ContainerKind) -> Result<(), ParseError> {
        self.push_frame(Frame::Container {
            kind,
            blocks: Vec::new(),
            loose: Vec::new(),
        })
    }

    fn start_tag(&mut self, tag: Tag<'_>) -> Result<(), ParseError> {
        match tag {
            Tag::Paragraph => self.push_inlines(InlineKind::Paragraph),
            Tag::Heading { level, .. } => {
                self.push_inlines(InlineKind::Heading(heading_level_to_num(level)))
            }
            Tag::BlockQuote(kind) => {
                self.push_container(ContainerKind::BlockQuote(kind.map(AlertKind::from)))
            }
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) if !info.trim().is_empty() => {
                        Some(info.into_string())
                    }
                    _ => None,
                };
                self.push_frame(Frame::Code {
                    info,
                    text: String::new(),
                })
            }
            Tag::HtmlBlock => self.push_frame(Frame::Html(String::new())),
            Tag::List(start) => self.push_frame(Frame::List {
                start,
                items: Vec::new(),
            }),
            Tag::Item => self.push_container(ContainerKind::Item),
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => self.push_frame(Frame::Ignored),
            Tag::DefinitionList => self.push_container(ContainerKind::DefinitionList),
            Tag::DefinitionListTitle => self.push_inlines(InlineKind::DefinitionTitle),
            Tag::DefinitionListDefinition => self.push_container(ContainerKind::DefinitionDetails),
            Tag::Table(alignments) => self.push_frame(Frame::Table {
                alignments: alignments.into_iter().map(convert_alignment).collect(),
                head: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
            }),
            // Rows and the head only group cells; the table frame tracks them.
            Tag::TableHead | Tag::TableRow => Ok(()),
            Tag::TableCell => self.push_inlines(InlineKind::Cell),
            Tag::Emphasis => self.push_inlines(InlineKind::Emphasis),
            Tag::Strong => self.push_inlines(InlineKind::Strong),
            Tag::Strikethrough => self.push_inlines(InlineKind::Strikethrough),
            Tag::Superscript => self.push_inlines(InlineKind::Superscript),
            Tag::Subscript => self.push_inlines(InlineKind::Subscript),
            Tag::Link {
                dest_url, title, ..
            } => self.push_inlines(InlineKind::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.push_inlines(InlineKind::Image {
                src: dest_url.into_string(),
                title: title.into_string(),
            }),
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableHead => {
                if let Some(Frame::Table { head, row, .. }) = self.stack.last_mut() {
                    *head = std::mem::take(row);
                }
                return;
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
                return;
            }
            _ => {}
        }

        // Root is never closed by an end tag.
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame {
            Frame::Inlines { kind, inlines } => self.close_inlines(kind, inlines),
            Frame::Container {
                kind,
                mut blocks,
                loose,
            } => {
                if !loose.is_empty() {
                    blocks.push(Block::Plain(loose));
                }
                match kind {
                    ContainerKind::Item => {
                        if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                            items.push(blocks);
                        }
                    }
                    ContainerKind::BlockQuote(alert) => {
                        self.attach_block(Block::BlockQuote { alert, blocks });
                    }
                    ContainerKind::DefinitionList => {
                        self.attach_block(Block::DefinitionList(blocks));
                    }
                    ContainerKind::DefinitionDetails => {
                        self.attach_block(Block::DefinitionDetails(blocks));
                    }
                    ContainerKind::Root => {}
                }
            }
            Frame::List { start, items } => self.attach_block(Block::List { start, items }),
            Frame::Table {
                alignments,
                head,
                rows,
                ..
            } => self.attach_block(Block::Table {
                alignments,
                head,
                rows,
            }),
            Frame::Code { info, text } => {
                let block = self.code_block(info.as_deref(), text);
                self.attach_block(block);
            }
            Frame::Html(html) => {
                let block = if self.config.allow_raw_html {
                    Block::Html(html)
                } else {
                    Block::Paragraph(vec![Inline::Text(html.trim_end().to_owned())])
                };
                self.attach_block(block);
            }
            Frame::Ignored => {}
        }
    }

    fn close_inlines(&mut self, kind: InlineKind, inlines: Vec<Inline>) {
        let inlines = if matches!(kind, InlineKind::Link { .. }) || self.inside_link() {
            inlines
        } else {
            self.linkify(inlines)
        };

        match kind {
            InlineKind::Paragraph => self.attach_block(Block::Paragraph(inlines)),
            InlineKind::Heading(level) => {
                let text = plain_text(&inlines);
                let id = self.heading_ids.allocate(&text);
                if level == 1 && self.title.is_none() {
                    self.title = Some(text.trim().to_owned());
                }
                self.attach_block(Block::Heading {
                    level,
                    id,
                    content: inlines,
                });
            }
            InlineKind::Cell => {
                if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                    row.push(inlines);
                }
            }
            InlineKind::DefinitionTitle => self.attach_block(Block::DefinitionTitle(inlines)),
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis(inlines)),
            InlineKind::Strong => self.push_inline(Inline::Strong(inlines)),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough(inlines)),
            InlineKind::Superscript => self.push_inline(Inline::Superscript(inlines)),
            InlineKind::Subscript => self.push_inline(Inline::Subscript(inlines)),
            InlineKind::Link { href, title } => self.push_inline(Inline::Link {
                href,
                title,
                content: inlines,
            }),
            InlineKind::Image { src, title } => self.push_inline(Inline::Image {
                src,
                title,
                alt: plain_text(&inlines),
            }),
        }
    }

    fn inside_link(&self) -> bool {
        self.stack.iter().any(|frame| {
            matches!(
                frame,
                Frame::Inlines {
                    kind: InlineKind::Link { .. },
                    ..
                }
            )
        })
    }

    fn linkify(&self, inlines: Vec<Inline>) -> Vec<Inline> {
        if !self.config.autolink_bare_urls {
            return inlines;
        }
        inlines
            .into_iter()
            .flat_map(|inline| match inline {
                Inline::Text(text) => autolink(&text),
                other => vec![other],
            })
            .collect()
    }

    fn code_block(&mut self, info: Option<&str>, source: String) -> Block {
        let index = self.code_block_index;
        self.code_block_index += 1;

        let (language, attrs) = match info {
            Some(info) => parse_fence_info(info),
            None => (String::new(), HashMap::new()),
        };

        if !language.is_empty() {
            let processed = self.processors.iter_mut().find_map(|processor| {
                match processor.process(&language, &attrs, &source, index) {
                    ProcessResult::Block(block) => Some(block),
                    ProcessResult::PassThrough => None,
                }
            });
            if let Some(block) = processed {
                return block;
            }
        }

        Block::CodeBlock {
            language: (!language.is_empty()).then_some(language),
            source,
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { text: buf, .. } | Frame::Html(buf)) => buf.push_str(text),
            _ => self.push_inline(Inline::Text(text.to_owned())),
        }
    }

    fn raw_html(&mut self, html: &str) {
        if let Some(Frame::Html(buf)) = self.stack.last_mut() {
            buf.push_str(html);
            return;
        }
        let inline = if self.config.allow_raw_html {
            Inline::Html(html.to_owned())
        } else {
            Inline::Text(html.to_owned())
        };
        self.push_inline(inline);
    }

    fn push_inline(&mut self, inline: Inline) {
        let target = match self.stack.last_mut() {
            Some(Frame::Inlines { inlines, .. }) => inlines,
            Some(Frame::Container { loose, .. }) => loose,
            _ => return,
        };
        // Adjacent text events are merged so runs stay whole.
        if let (Inline::Text(new), Some(Inline::Text(prev))) = (&inline, target.last_mut()) {
            prev.push_str(new);
            return;
        }
        target.push(inline);
    }

    fn attach_block(&mut self, block: Block) {
        if let Some(Frame::Container { blocks, loose, .. }) = self.stack.last_mut() {
            if !loose.is_empty() {
                blocks.push(Block::Plain(std::mem::take(loose)));
            }
            blocks.push(block);
        }
    }
}

fn convert_alignment(alignment: pulldown_cmark::Alignment) -> Alignment {
    match alignment {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}
